use axum::{extract::State, Json};

use crate::{
    chains::{all_chain_configs, ChainConfig},
    error::Result,
    models::ApiResponse,
};

use super::AppState;

/// GET /api/v1/chains
///
/// Every known chain with its resolved endpoint order (user primary first).
pub async fn list_chains(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChainConfig>>>> {
    let overrides = state.storage.load_rpc_configs().await?;
    Ok(Json(ApiResponse::success(all_chain_configs(&overrides))))
}
