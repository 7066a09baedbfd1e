use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

// ==================== RPC CONFIG ====================
/// User-supplied endpoint for a chain. Takes precedence over built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub id: String,
    pub chain: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Add/edit form for an [`RpcConfig`], validated before it is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfigDraft {
    pub chain: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl RpcConfigDraft {
    pub fn validate(self) -> Result<Self> {
        let chain = self.chain.trim().to_ascii_uppercase();
        if chain.is_empty() {
            return Err(AppError::BadRequest("Chain is required".to_string()));
        }
        if !chain.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AppError::BadRequest(format!("Invalid chain id: {}", chain)));
        }

        let url = self.url.trim().to_string();
        let parsed = Url::parse(&url)
            .map_err(|e| AppError::BadRequest(format!("Invalid RPC URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::BadRequest(
                "RPC URL must use http or https".to_string(),
            ));
        }

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self { chain, url, name })
    }

    pub fn into_config(self, id: String) -> RpcConfig {
        RpcConfig {
            id,
            chain: self.chain,
            url: self.url,
            name: self.name,
        }
    }
}
