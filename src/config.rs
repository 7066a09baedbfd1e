use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_DELAY_MS, DEFAULT_MAX_RETAINED_RUNS, DEFAULT_MAX_RETRIES,
    DEFAULT_MAX_STORED_FILE_WALLETS,
    DEFAULT_RESULTS_PAGE_SIZE, DEFAULT_RPC_BACKOFF_BASE_MS, DEFAULT_RPC_TIMEOUT_SECS,
    DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Storage
    pub redis_url: Option<String>,

    // RPC querying
    pub rpc_timeout_secs: u64,
    pub rpc_max_retries: u32,
    pub rpc_backoff_base_ms: u64,

    // Batch orchestration
    pub batch_delay_ms: u64,
    pub default_worker_count: usize,
    pub max_worker_count: usize,

    // Results / persistence
    pub results_page_size: usize,
    pub max_stored_file_wallets: usize,
    /// Finished check runs kept in memory; older ones are evicted.
    pub max_retained_runs: usize,

    // Target list
    pub targets_url: Option<String>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            redis_url: optional_var("REDIS_URL"),

            rpc_timeout_secs: env::var("RPC_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_RPC_TIMEOUT_SECS.to_string())
                .parse()?,
            rpc_max_retries: env::var("RPC_MAX_RETRIES")
                .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
                .parse()?,
            rpc_backoff_base_ms: env::var("RPC_BACKOFF_BASE_MS")
                .unwrap_or_else(|_| DEFAULT_RPC_BACKOFF_BASE_MS.to_string())
                .parse()?,

            batch_delay_ms: env::var("BATCH_DELAY_MS")
                .unwrap_or_else(|_| DEFAULT_BATCH_DELAY_MS.to_string())
                .parse()?,
            default_worker_count: env::var("DEFAULT_WORKER_COUNT")
                .unwrap_or_else(|_| DEFAULT_WORKER_COUNT.to_string())
                .parse()?,
            max_worker_count: env::var("MAX_WORKER_COUNT")
                .unwrap_or_else(|_| MAX_WORKER_COUNT.to_string())
                .parse()?,

            results_page_size: env::var("RESULTS_PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_RESULTS_PAGE_SIZE.to_string())
                .parse()?,
            max_stored_file_wallets: env::var("MAX_STORED_FILE_WALLETS")
                .unwrap_or_else(|_| DEFAULT_MAX_STORED_FILE_WALLETS.to_string())
                .parse()?,
            max_retained_runs: env::var("MAX_RETAINED_RUNS")
                .unwrap_or_else(|_| DEFAULT_MAX_RETAINED_RUNS.to_string())
                .parse()?,

            targets_url: optional_var("TARGETS_URL"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("RPC_TIMEOUT_SECS must be > 0");
        }
        if self.rpc_max_retries == 0 {
            anyhow::bail!("RPC_MAX_RETRIES must be > 0");
        }
        if self.default_worker_count == 0 || self.max_worker_count == 0 {
            anyhow::bail!("Worker counts must be > 0");
        }
        if self.default_worker_count > self.max_worker_count {
            anyhow::bail!(
                "DEFAULT_WORKER_COUNT ({}) exceeds MAX_WORKER_COUNT ({})",
                self.default_worker_count,
                self.max_worker_count
            );
        }
        if self.results_page_size == 0 {
            anyhow::bail!("RESULTS_PAGE_SIZE must be > 0");
        }
        if let Some(redis_url) = &self.redis_url {
            url::Url::parse(redis_url)
                .map_err(|e| anyhow::anyhow!("Invalid REDIS_URL: {e}"))?;
        }
        if let Some(targets_url) = &self.targets_url {
            let parsed = url::Url::parse(targets_url)
                .map_err(|e| anyhow::anyhow!("Invalid TARGETS_URL: {e}"))?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                anyhow::bail!("TARGETS_URL must be http(s)");
            }
        }

        if self.redis_url.is_none() {
            tracing::warn!("REDIS_URL not set; persisted state lives in memory only");
        }
        if self.rpc_backoff_base_ms == 0 {
            tracing::warn!("RPC_BACKOFF_BASE_MS is 0; retries will not back off");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn rpc_backoff_base(&self) -> Duration {
        Duration::from_millis(self.rpc_backoff_base_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

// Internal helper that supports `optional_var` operations.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "development".to_string(),
        redis_url: None,
        rpc_timeout_secs: 10,
        rpc_max_retries: 3,
        rpc_backoff_base_ms: 0,
        batch_delay_ms: 0,
        default_worker_count: 4,
        max_worker_count: 64,
        results_page_size: 20,
        max_stored_file_wallets: 10_000,
        max_retained_runs: 20,
        targets_url: None,
        cors_allowed_origins: "*".to_string(),
    }
}
