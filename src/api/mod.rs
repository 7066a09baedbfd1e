// src/api/mod.rs

pub mod chains;
pub mod check;
pub mod files;
pub mod health;
pub mod rpc;
pub mod targets;
pub mod wallets;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Wallet, WalletFile, WalletFileSummary, WalletFileType};
use crate::rpc::ChainQuery;
use crate::services::{BalanceChecker, CheckRunManager};
use crate::storage::Storage;
use crate::utils::{new_id, timestamped_file_name};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub runs: CheckRunManager,
    pub checker: Arc<BalanceChecker>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, storage: Storage, query: Arc<dyn ChainQuery>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.rpc_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            checker: Arc::new(BalanceChecker::from_config(query, &config)),
            runs: CheckRunManager::new(config.max_retained_runs),
            config,
            storage,
            http,
        })
    }
}

/// Result of persisting a wallet list as a file record.
#[derive(Debug, serde::Serialize)]
pub struct StoredFile {
    pub file: WalletFileSummary,
    /// `false` when the list exceeded the storable size.
    pub stored: bool,
}

// Internal helper that supports `store_wallet_file` operations.
pub(crate) async fn store_wallet_file(
    state: &AppState,
    prefix: &str,
    wallets: Vec<Wallet>,
    file_type: WalletFileType,
) -> Result<StoredFile> {
    let file = WalletFile {
        id: new_id(),
        name: timestamped_file_name(prefix),
        wallets,
        created_at: chrono::Utc::now(),
        file_type,
    };
    let summary = WalletFileSummary::from(&file);
    let stored = state.storage.add_file(file).await?;
    Ok(StoredFile {
        file: summary,
        stored,
    })
}

#[cfg(test)]
pub(crate) fn test_state(query: Arc<dyn ChainQuery>) -> AppState {
    use crate::storage::MemoryStore;

    let config = crate::config::test_config();
    let storage = Storage::new(Arc::new(MemoryStore::new()), config.max_stored_file_wallets);
    AppState::new(config, storage, query).expect("test state")
}
