use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{coins_bip39::English, MnemonicBuilder};
use ethers::utils::{secret_key_to_address, to_checksum};

use crate::constants::ETH_DERIVATION_PATH_PREFIX;
use crate::error::{AppError, Result};

/// Parses a hex-encoded secp256k1 secret, with or without `0x`.
pub fn signing_key_from_hex(private_key: &str) -> Result<SigningKey> {
    let trimmed = private_key.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if body.len() != 64 {
        return Err(AppError::InvalidPrivateKey(format!(
            "expected 64 hex characters, got {}",
            body.len()
        )));
    }
    let bytes =
        hex::decode(body).map_err(|e| AppError::InvalidPrivateKey(format!("not hex: {}", e)))?;
    SigningKey::from_slice(&bytes).map_err(|_| {
        AppError::InvalidPrivateKey("value is not a valid secp256k1 scalar".to_string())
    })
}

/// EIP-55 checksummed address of the key.
pub fn address_from_signing_key(key: &SigningKey) -> String {
    to_checksum(&secret_key_to_address(key), None)
}

pub fn private_key_hex(key: &SigningKey) -> String {
    format!("0x{}", hex::encode(key.to_bytes()))
}

/// BIP-39 English phrase, account `m/44'/60'/0'/0/{index}`.
pub fn signing_key_from_mnemonic(phrase: &str, index: u32) -> Result<SigningKey> {
    let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(AppError::InvalidMnemonic("phrase is empty".to_string()));
    }
    let path = format!("{}/{}", ETH_DERIVATION_PATH_PREFIX, index);
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(normalized.as_str())
        .derivation_path(&path)
        .map_err(|e| AppError::InvalidMnemonic(e.to_string()))?
        .build()
        .map_err(|e| AppError::InvalidMnemonic(e.to_string()))?;
    Ok(wallet.signer().clone())
}
