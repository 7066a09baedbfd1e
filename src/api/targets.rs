use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, Wallet, WalletFileType},
    services::TargetList,
};

use super::{store_wallet_file, AppState, StoredFile};

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub wallets: Option<Vec<Wallet>>,
    pub file_id: Option<String>,
    /// Inline target list; falls back to `TARGETS_URL`.
    pub targets: Option<String>,
    #[serde(default = "default_true")]
    pub save: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub target_count: usize,
    pub checked: usize,
    pub matches: Vec<Wallet>,
    pub file: Option<StoredFile>,
}

/// POST /api/v1/targets/match
///
/// Matches are stored as a `matched` file (`expected_result_*.txt`) unless
/// `save` is false.
pub async fn match_targets(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<ApiResponse<MatchResponse>>> {
    let targets = match (&req.targets, &state.config.targets_url) {
        (Some(text), _) => TargetList::parse(text),
        (None, Some(url)) => TargetList::fetch(&state.http, url).await,
        (None, None) => {
            return Err(AppError::BadRequest(
                "No target list given and TARGETS_URL is not configured".to_string(),
            ))
        }
    };

    let wallets = match (req.wallets, &req.file_id) {
        (Some(wallets), _) => wallets,
        (None, Some(id)) => state.storage.get_file(id).await?.wallets,
        (None, None) => state.storage.load_wallets().await?,
    };

    let matches = targets.matching(&wallets);
    tracing::info!(
        "{} of {} wallet(s) match {} target(s)",
        matches.len(),
        wallets.len(),
        targets.len()
    );

    let file = if req.save && !matches.is_empty() {
        Some(store_wallet_file(&state, "expected_result", matches.clone(), WalletFileType::Matched).await?)
    } else {
        None
    };

    Ok(Json(ApiResponse::success(MatchResponse {
        target_count: targets.len(),
        checked: wallets.len(),
        matches,
        file,
    })))
}
