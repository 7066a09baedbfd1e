use async_trait::async_trait;
use ethers::types::U256;
use serde::Deserialize;
use std::time::Duration;

use crate::constants::{
    BLOCK_TAG_LATEST, JSONRPC_REQUEST_ID, JSONRPC_VERSION, METHOD_GET_BALANCE,
    METHOD_GET_TRANSACTION_COUNT,
};
use crate::error::{AppError, Result};
use crate::models::Wei;

fn rpc_request(method: &str, address: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": [address, BLOCK_TAG_LATEST],
        "id": JSONRPC_REQUEST_ID
    })
}

/// Single-endpoint account queries. Every failure is a `QueryFailed`.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// `eth_getBalance` at `latest`, in wei.
    async fn query_balance(&self, address: &str, endpoint: &str) -> Result<U256>;

    /// `eth_getTransactionCount` at `latest`.
    async fn query_nonce(&self, address: &str, endpoint: &str) -> Result<u64>;
}

/// JSON-RPC 2.0 client for EVM nodes.
pub struct EvmRpcClient {
    client: reqwest::Client,
}

impl EvmRpcClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build RPC client: {}", e)))?;
        Ok(Self { client })
    }

    /// Posts one call and returns its `result` string.
    async fn call(&self, endpoint: &str, method: &str, address: &str) -> Result<String> {
        let request = rpc_request(method, address);

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::QueryFailed(format!("{} {}: {}", method, endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::QueryFailed(format!(
                "{} {}: HTTP {}",
                method, endpoint, status
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| AppError::QueryFailed(format!("{} {}: {}", method, endpoint, e)))?;

        if let Some(error) = body.error {
            return Err(AppError::QueryFailed(format!(
                "{} {}: node error {}",
                method, endpoint, error
            )));
        }

        body.result.ok_or_else(|| {
            AppError::QueryFailed(format!("{} {}: response has no result", method, endpoint))
        })
    }
}

#[async_trait]
impl ChainQuery for EvmRpcClient {
    async fn query_balance(&self, address: &str, endpoint: &str) -> Result<U256> {
        let raw = self.call(endpoint, METHOD_GET_BALANCE, address).await?;
        Wei::parse(&raw)
            .map(|wei| wei.as_u256())
            .ok_or_else(|| AppError::QueryFailed(format!("unparsable balance: {}", raw)))
    }

    async fn query_nonce(&self, address: &str, endpoint: &str) -> Result<u64> {
        let raw = self
            .call(endpoint, METHOD_GET_TRANSACTION_COUNT, address)
            .await?;
        parse_quantity(&raw)
            .ok_or_else(|| AppError::QueryFailed(format!("unparsable nonce: {}", raw)))
    }
}

// Internal helper that supports `query_nonce` operations.
fn parse_quantity(raw: &str) -> Option<u64> {
    let body = raw.trim().strip_prefix("0x")?;
    if body.is_empty() {
        return None;
    }
    u64::from_str_radix(body, 16).ok()
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn client() -> EvmRpcClient {
        EvmRpcClient::new(Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn request_body_targets_latest_block() {
        let body = rpc_request(METHOD_GET_BALANCE, ADDRESS);
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "eth_getBalance");
        assert_eq!(body["params"][0], ADDRESS);
        assert_eq!(body["params"][1], "latest");
        assert_eq!(body["id"], 1);
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x0"), Some(0));
        assert_eq!(parse_quantity("0x1a"), Some(26));
        assert_eq!(parse_quantity("0x"), None);
        assert_eq!(parse_quantity("26"), None);
    }

    #[tokio::test]
    async fn balance_is_parsed_from_hex_result() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_body(Matcher::Regex(r#""method"\s*:\s*"eth_getBalance""#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x14d1120d7b160000"}"#)
            .create_async()
            .await;

        let balance = client()
            .query_balance(ADDRESS, &server.url())
            .await
            .expect("balance");
        assert_eq!(balance, U256::from(1_500_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn nonce_is_parsed_from_hex_result() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_body(Matcher::Regex(
                r#""method"\s*:\s*"eth_getTransactionCount""#.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x7"}"#)
            .create_async()
            .await;

        let nonce = client()
            .query_nonce(ADDRESS, &server.url())
            .await
            .expect("nonce");
        assert_eq!(nonce, 7);
    }

    #[tokio::test]
    async fn http_errors_become_query_failures() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client()
            .query_balance(ADDRESS, &server.url())
            .await
            .expect_err("503");
        assert!(matches!(err, AppError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn missing_result_and_node_errors_are_failures() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}"#)
            .create_async()
            .await;

        let err = client()
            .query_nonce(ADDRESS, &server.url())
            .await
            .expect_err("node error");
        assert!(matches!(err, AppError::QueryFailed(_)));

        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;
        let err = client()
            .query_balance(ADDRESS, &server.url())
            .await
            .expect_err("null result");
        assert!(matches!(err, AppError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;

        let err = client()
            .query_balance(ADDRESS, &server.url())
            .await
            .expect_err("html body");
        assert!(matches!(err, AppError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_failure() {
        let err = client()
            .query_balance(ADDRESS, "http://127.0.0.1:1")
            .await
            .expect_err("connection refused");
        assert!(matches!(err, AppError::QueryFailed(_)));
    }
}
