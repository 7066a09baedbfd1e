use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chains::{chain_config, ChainConfig},
    constants::NATIVE_DECIMALS,
    error::{AppError, Result},
    models::{
        ApiResponse, CheckMode, ExecutionStrategy, PaginatedResponse, Wallet, WalletFileType,
    },
    services::{
        check_runs::RunSnapshot,
        report::{
            export_balances, export_used_wallets, filter_by_usage, format_balance, newest_first,
            paginate, usage_statistics, UsageFilter, UsageStatistics, WalletReport,
        },
        CheckRequest,
    },
    utils::timestamped_file_name,
};

use super::{store_wallet_file, AppState, StoredFile};

#[derive(Debug, Deserialize)]
pub struct StartCheckRequest {
    /// Explicit wallets. Takes precedence over every other source.
    pub wallets: Option<Vec<Wallet>>,
    /// A stored wallet file.
    pub file_id: Option<String>,
    /// Take the file handed over via `/files/{id}/select`.
    #[serde(default)]
    pub use_selected_file: bool,
    pub chains: Vec<String>,
    pub worker_count: Option<usize>,
    #[serde(default)]
    pub mode: CheckMode,
    #[serde(default)]
    pub strategy: ExecutionStrategy,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub filter: Option<UsageFilter>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    #[default]
    Balances,
    Used,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub kind: ExportKind,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub file_name: String,
    pub line_count: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainBalanceView {
    pub chain: String,
    pub symbol: String,
    pub balance_wei: String,
    pub balance: String,
    pub nonce: Option<u64>,
    pub indeterminate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletResultView {
    pub wallet_index: usize,
    pub address: String,
    pub private_key: String,
    pub has_balance: bool,
    pub is_used: bool,
    pub balances: Vec<ChainBalanceView>,
    pub checked_at: DateTime<Utc>,
}

impl From<&WalletReport> for WalletResultView {
    fn from(report: &WalletReport) -> Self {
        let balances = report
            .checks
            .iter()
            .map(|check| {
                let wei = check.balance_wei().to_string();
                ChainBalanceView {
                    chain: check.chain_id().to_string(),
                    symbol: check.symbol().to_string(),
                    balance: format_balance(&wei, NATIVE_DECIMALS),
                    balance_wei: wei,
                    nonce: check.as_usage().map(|status| status.nonce),
                    indeterminate: check.is_indeterminate(),
                }
            })
            .collect();

        Self {
            wallet_index: report.wallet_index,
            address: report.wallet.address.clone(),
            private_key: report.wallet.private_key.clone(),
            has_balance: report.has_balance,
            is_used: report.is_used,
            balances,
            checked_at: report.checked_at,
        }
    }
}

// Internal helper that supports `start_check` operations.
async fn resolve_wallets(
    state: &AppState,
    req: &StartCheckRequest,
) -> Result<(Vec<Wallet>, Option<String>)> {
    if let Some(wallets) = &req.wallets {
        return Ok((wallets.clone(), None));
    }
    if let Some(id) = &req.file_id {
        let file = state.storage.get_file(id).await?;
        return Ok((file.wallets, Some(file.name)));
    }
    if req.use_selected_file {
        let file = state
            .storage
            .take_selected_file()
            .await?
            .ok_or_else(|| AppError::BadRequest("No file selected for checking".to_string()))?;
        return Ok((file.wallets, Some(file.name)));
    }
    Ok((state.storage.load_wallets().await?, None))
}

/// POST /api/v1/check/start
///
/// Wallet source order: explicit list, stored file, selected file, saved
/// wallets. Progress is polled through `GET /api/v1/check/{id}`.
pub async fn start_check(
    State(state): State<AppState>,
    Json(req): Json<StartCheckRequest>,
) -> Result<Json<ApiResponse<RunSnapshot>>> {
    let worker_count = req
        .worker_count
        .unwrap_or(state.config.default_worker_count);
    if worker_count > state.config.max_worker_count {
        return Err(AppError::BadRequest(format!(
            "worker_count must not exceed {}",
            state.config.max_worker_count
        )));
    }

    let overrides = state.storage.load_rpc_configs().await?;
    let mut chains: Vec<ChainConfig> = Vec::with_capacity(req.chains.len());
    for id in &req.chains {
        let chain = chain_config(id, &overrides);
        if chains.iter().any(|c| c.id == chain.id) {
            continue;
        }
        chains.push(chain);
    }

    let (wallets, source) = resolve_wallets(&state, &req).await?;
    let request = CheckRequest::new(wallets, chains, worker_count, req.mode, req.strategy)?;
    let run = state
        .runs
        .start(state.checker.clone(), request, source)
        .await;

    Ok(Json(ApiResponse::success(run.snapshot().await)))
}

/// GET /api/v1/check/{id}
pub async fn get_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunSnapshot>>> {
    let run = state.runs.get(&id).await?;
    Ok(Json(ApiResponse::success(run.snapshot().await)))
}

/// POST /api/v1/check/{id}/cancel
pub async fn cancel_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunSnapshot>>> {
    let run = state.runs.cancel(&id).await?;
    Ok(Json(ApiResponse::success(run.snapshot().await)))
}

/// DELETE /api/v1/check/{id}
///
/// Forgets the run and its results, cancelling it if still running.
pub async fn delete_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunSnapshot>>> {
    let run = state.runs.remove(&id).await?;
    Ok(Json(ApiResponse::success(run.snapshot().await)))
}

/// GET /api/v1/check/{id}/results
///
/// Per-wallet results, newest first.
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<WalletResultView>>>> {
    let run = state.runs.get(&id).await?;
    let reports: Vec<WalletReport> = newest_first(run.reports().await)
        .into_iter()
        .filter(|r| query.filter.map_or(true, |f| f.matches(r)))
        .collect();
    let views: Vec<WalletResultView> = reports.iter().map(WalletResultView::from).collect();

    let page = paginate(
        &views,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(state.config.results_page_size),
    );
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/v1/check/{id}/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UsageStatistics>>> {
    let run = state.runs.get(&id).await?;
    Ok(Json(ApiResponse::success(usage_statistics(
        &run.reports().await,
    ))))
}

/// GET /api/v1/check/{id}/export
pub async fn export_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ApiResponse<ExportResponse>>> {
    let run = state.runs.get(&id).await?;
    let reports = run.reports().await;

    let (file_name, content) = match query.kind {
        ExportKind::Balances => (
            timestamped_file_name("balance_results"),
            export_balances(&reports),
        ),
        ExportKind::Used => {
            let chains: Vec<&str> = run.request.chains.iter().map(|c| c.id.as_str()).collect();
            (
                timestamped_file_name(&format!("wallet_nonce_gt0_{}", chains.join("-"))),
                export_used_wallets(&reports, run.source.as_deref()),
            )
        }
    };

    Ok(Json(ApiResponse::success(ExportResponse {
        file_name,
        line_count: content.lines().count(),
        content,
    })))
}

/// POST /api/v1/check/{id}/save
///
/// Keeps the funded wallets of a run as a `checked` file record.
pub async fn save_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<StoredFile>>> {
    let run = state.runs.get(&id).await?;
    let funded = filter_by_usage(&run.reports().await, UsageFilter::WithBalance);
    if funded.is_empty() {
        return Err(AppError::BadRequest(
            "Run has no wallets with a balance".to_string(),
        ));
    }
    let stored = store_wallet_file(&state, "balance_results", funded, WalletFileType::Checked).await?;
    Ok(Json(ApiResponse::success(stored)))
}
