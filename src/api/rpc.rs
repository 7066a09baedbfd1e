use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::Result,
    models::{ApiResponse, RpcConfig, RpcConfigDraft},
    utils::new_id,
};

use super::AppState;

/// GET /api/v1/rpc/configs
pub async fn list_configs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RpcConfig>>>> {
    let configs = state.storage.load_rpc_configs().await?;
    Ok(Json(ApiResponse::success(configs)))
}

/// POST /api/v1/rpc/configs
///
/// A URL outside the built-in list becomes the chain's primary endpoint,
/// ahead of the stored defaults. Only the first such URL per chain is used.
pub async fn create_config(
    State(state): State<AppState>,
    Json(draft): Json<RpcConfigDraft>,
) -> Result<Json<ApiResponse<RpcConfig>>> {
    let config = draft.validate()?.into_config(new_id());
    let saved = state.storage.add_rpc_config(config).await?;
    tracing::info!("Added RPC config {} for {}", saved.id, saved.chain);
    Ok(Json(ApiResponse::success(saved)))
}

/// PUT /api/v1/rpc/configs/{id}
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<RpcConfigDraft>,
) -> Result<Json<ApiResponse<RpcConfig>>> {
    let config = draft.validate()?.into_config(id);
    let saved = state.storage.update_rpc_config(config).await?;
    Ok(Json(ApiResponse::success(saved)))
}

/// DELETE /api/v1/rpc/configs/{id}
pub async fn delete_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>> {
    state.storage.remove_rpc_config(&id).await?;
    Ok(Json(ApiResponse::success(id)))
}

/// POST /api/v1/rpc/configs/reset
pub async fn reset_configs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RpcConfig>>>> {
    let configs = state.storage.reset_rpc_configs().await?;
    tracing::info!("RPC configs reset to {} defaults", configs.len());
    Ok(Json(ApiResponse::success(configs)))
}
