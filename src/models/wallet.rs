use serde::{Deserialize, Serialize};

use crate::crypto::keys::{
    address_from_signing_key, private_key_hex, signing_key_from_hex, signing_key_from_mnemonic,
};
use crate::error::Result;

// ==================== WALLET ====================
/// Address / private-key pair.
///
/// Wallets loaded from files or storage are taken as-is; the address is never
/// re-derived from the key once the value exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    pub private_key: String,
}

impl Wallet {
    pub fn new(address: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            private_key: private_key.into(),
        }
    }

    /// Derives the wallet for a hex private key (`0x` optional).
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let key = signing_key_from_hex(private_key)?;
        Ok(Self {
            address: address_from_signing_key(&key),
            private_key: private_key_hex(&key),
        })
    }

    /// Derives account `index` of a BIP-39 phrase on the Ethereum path.
    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self> {
        let key = signing_key_from_mnemonic(phrase, index)?;
        Ok(Self {
            address: address_from_signing_key(&key),
            private_key: private_key_hex(&key),
        })
    }

    /// Lowercase address, the form used for every address comparison.
    pub fn normalized_address(&self) -> String {
        self.address.trim().to_ascii_lowercase()
    }
}

pub fn is_valid_evm_address(value: &str) -> bool {
    let normalized = value.trim();
    normalized.starts_with("0x")
        && normalized.len() == 42
        && normalized[2..].chars().all(|c| c.is_ascii_hexdigit())
}
