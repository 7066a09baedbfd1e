use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wallet::Wallet;

// ==================== WALLET FILE ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletFileType {
    Generated,
    Uploaded,
    Matched,
    Checked,
}

/// A stored wallet list, one per upload or check session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFile {
    pub id: String,
    pub name: String,
    pub wallets: Vec<Wallet>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub file_type: WalletFileType,
}

/// Listing view of a [`WalletFile`] without the wallets themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFileSummary {
    pub id: String,
    pub name: String,
    pub wallet_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub file_type: WalletFileType,
}

impl From<&WalletFile> for WalletFileSummary {
    fn from(file: &WalletFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            wallet_count: file.wallets.len(),
            created_at: file.created_at,
            file_type: file.file_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_file_serializes_camel_case_layout() {
        let file = WalletFile {
            id: "1".to_string(),
            name: "wallet.txt".to_string(),
            wallets: vec![Wallet::new("0xabc", "0x123")],
            created_at: Utc::now(),
            file_type: WalletFileType::Uploaded,
        };
        let json = serde_json::to_value(&file).expect("serialize");
        assert_eq!(json["type"], "uploaded");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["wallets"][0]["privateKey"], "0x123");
    }
}
