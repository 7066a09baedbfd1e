use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::MAX_MNEMONIC_ACCOUNTS,
    error::{AppError, Result},
    models::{ApiResponse, Wallet, WalletFileType},
};

use super::{store_wallet_file, AppState, StoredFile};

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub private_keys: Vec<String>,
    pub mnemonic: Option<String>,
    /// Accounts to derive from the mnemonic.
    pub count: Option<u32>,
    pub start_index: Option<u32>,
    /// Also keep the wallets as a `generated` file record.
    #[serde(default)]
    pub save_as_file: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub wallets: Vec<Wallet>,
    pub saved_total: usize,
    pub file: Option<StoredFile>,
}

impl ImportRequest {
    fn derive(&self) -> Result<Vec<Wallet>> {
        let mut wallets = Vec::new();
        for key in self.private_keys.iter().filter(|k| !k.trim().is_empty()) {
            wallets.push(Wallet::from_private_key(key)?);
        }

        if let Some(phrase) = self.mnemonic.as_deref() {
            let count = self.count.unwrap_or(1);
            if count == 0 || count > MAX_MNEMONIC_ACCOUNTS {
                return Err(AppError::BadRequest(format!(
                    "count must be between 1 and {}",
                    MAX_MNEMONIC_ACCOUNTS
                )));
            }
            let start = self.start_index.unwrap_or(0);
            for offset in 0..count {
                let index = start.checked_add(offset).ok_or_else(|| {
                    AppError::BadRequest("Derivation index out of range".to_string())
                })?;
                wallets.push(Wallet::from_mnemonic(phrase, index)?);
            }
        }

        if wallets.is_empty() {
            return Err(AppError::BadRequest(
                "Provide private_keys or a mnemonic".to_string(),
            ));
        }
        Ok(wallets)
    }
}

/// POST /api/v1/wallets/import
pub async fn import_wallets(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ApiResponse<ImportResponse>>> {
    let wallets = req.derive()?;
    let saved_total = state.storage.add_wallets(&wallets).await?;

    let file = if req.save_as_file {
        Some(store_wallet_file(&state, "wallet", wallets.clone(), WalletFileType::Generated).await?)
    } else {
        None
    };

    tracing::info!("Imported {} wallet(s)", wallets.len());
    Ok(Json(ApiResponse::success(ImportResponse {
        wallets,
        saved_total,
        file,
    })))
}

/// GET /api/v1/wallets
pub async fn list_wallets(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Wallet>>>> {
    let wallets = state.storage.load_wallets().await?;
    Ok(Json(ApiResponse::success(wallets)))
}

/// DELETE /api/v1/wallets/{index}
pub async fn delete_wallet(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ApiResponse<Wallet>>> {
    let removed = state.storage.remove_wallet(index).await?;
    Ok(Json(ApiResponse::success(removed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state;
    use crate::rpc::EvmRpcClient;
    use std::sync::Arc;
    use std::time::Duration;

    const HARDHAT_PHRASE: &str = "test test test test test test test test test test test junk";

    fn state() -> AppState {
        test_state(Arc::new(
            EvmRpcClient::new(Duration::from_secs(1)).expect("client"),
        ))
    }

    fn request() -> ImportRequest {
        ImportRequest {
            private_keys: vec![],
            mnemonic: None,
            count: None,
            start_index: None,
            save_as_file: false,
        }
    }

    #[tokio::test]
    async fn import_from_key_and_mnemonic() {
        let state = state();
        let req = ImportRequest {
            private_keys: vec![
                "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".to_string(),
            ],
            mnemonic: Some(HARDHAT_PHRASE.to_string()),
            count: Some(2),
            save_as_file: true,
            ..request()
        };
        let Json(response) = import_wallets(State(state.clone()), Json(req))
            .await
            .expect("import");

        let addresses: Vec<&str> = response.data.wallets.iter().map(|w| w.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23",
                "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            ]
        );
        assert_eq!(response.data.saved_total, 3);
        let file = response.data.file.expect("file stored");
        assert!(file.stored);
        assert!(file.file.name.starts_with("wallet_"));

        let Json(listed) = list_wallets(State(state.clone())).await.expect("list");
        assert_eq!(listed.data.len(), 3);
        delete_wallet(State(state.clone()), Path(0)).await.expect("delete");
        let Json(listed) = list_wallets(State(state)).await.expect("list");
        assert_eq!(listed.data.len(), 2);
    }

    #[tokio::test]
    async fn empty_or_invalid_import_is_rejected() {
        assert!(matches!(
            import_wallets(State(state()), Json(request())).await,
            Err(AppError::BadRequest(_))
        ));

        let bad_key = ImportRequest {
            private_keys: vec!["0x12".to_string()],
            ..request()
        };
        assert!(matches!(
            import_wallets(State(state()), Json(bad_key)).await,
            Err(AppError::InvalidPrivateKey(_))
        ));

        let too_many = ImportRequest {
            mnemonic: Some(HARDHAT_PHRASE.to_string()),
            count: Some(MAX_MNEMONIC_ACCOUNTS + 1),
            ..request()
        };
        assert!(matches!(
            import_wallets(State(state()), Json(too_many)).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
