use ethers::types::U256;
use std::future::Future;
use std::time::Duration;

use super::client::ChainQuery;
use crate::config::Config;
use crate::error::Result;
use crate::models::Lookup;

/// Attempt rounds across an ordered endpoint list with exponential backoff
/// between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff_base,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rpc_max_retries, config.rpc_backoff_base())
    }

    /// One pass, no backoff. Used by pool executors.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay after failed round `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `op` against each endpoint per round and returns the first success.
    /// Exhaustion is `Lookup::Indeterminate`, never an error.
    pub async fn run<T, F, Fut>(&self, label: &str, endpoints: &[String], mut op: F) -> Lookup<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for attempt in 0..self.max_retries {
            for endpoint in endpoints {
                match op(endpoint.clone()).await {
                    Ok(value) => return Lookup::Found(value),
                    Err(e) => {
                        tracing::warn!(
                            "{} failed on {} (attempt {}/{}): {}",
                            label,
                            endpoint,
                            attempt + 1,
                            self.max_retries,
                            e
                        );
                    }
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }
        }

        tracing::warn!(
            "{} exhausted {} endpoint(s) after {} attempt(s)",
            label,
            endpoints.len(),
            self.max_retries
        );
        Lookup::Indeterminate
    }

    pub async fn balance(
        &self,
        query: &dyn ChainQuery,
        address: &str,
        endpoints: &[String],
    ) -> Lookup<U256> {
        self.run("eth_getBalance", endpoints, move |endpoint| async move {
            query.query_balance(address, &endpoint).await
        })
        .await
    }

    pub async fn nonce(
        &self,
        query: &dyn ChainQuery,
        address: &str,
        endpoints: &[String],
    ) -> Lookup<u64> {
        self.run("eth_getTransactionCount", endpoints, move |endpoint| async move {
            query.query_nonce(address, &endpoint).await
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_MAX_RETRIES,
            Duration::from_millis(crate::constants::DEFAULT_RPC_BACKOFF_BASE_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails on every endpoint listed in `failing`, answers `value` elsewhere.
    struct ScriptedQuery {
        failing: Vec<String>,
        value: u64,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedQuery {
        fn new(failing: &[&str], value: u64) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                value,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn answer(&self, endpoint: &str) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .expect("lock")
                .push(endpoint.to_string());
            if self.failing.iter().any(|f| f == endpoint) {
                Err(AppError::QueryFailed(format!("{} down", endpoint)))
            } else {
                Ok(self.value)
            }
        }
    }

    #[async_trait]
    impl ChainQuery for ScriptedQuery {
        async fn query_balance(&self, _address: &str, endpoint: &str) -> Result<U256> {
            self.answer(endpoint).map(U256::from)
        }

        async fn query_nonce(&self, _address: &str, endpoint: &str) -> Result<u64> {
            self.answer(endpoint)
        }
    }

    fn endpoints(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO)
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(4000));
        assert_eq!(RetryPolicy::default(), policy);
    }

    #[tokio::test]
    async fn first_success_wins() {
        let query = ScriptedQuery::new(&[], 42);
        let result = fast_policy(3)
            .balance(&query, "0xabc", &endpoints(&["https://a", "https://b"]))
            .await;
        assert_eq!(result, Lookup::Found(U256::from(42u64)));
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_next_endpoint_in_order() {
        let query = ScriptedQuery::new(&["https://primary"], 1000);
        let result = fast_policy(3)
            .balance(
                &query,
                "0xabc",
                &endpoints(&["https://primary", "https://fallback"]),
            )
            .await;
        assert_eq!(result, Lookup::Found(U256::from(1000u64)));
        assert_eq!(
            *query.seen.lock().expect("lock"),
            vec!["https://primary".to_string(), "https://fallback".to_string()]
        );
    }

    #[tokio::test]
    async fn exhaustion_is_indeterminate_after_every_attempt() {
        let urls = ["https://a", "https://b", "https://c"];
        let query = ScriptedQuery::new(&urls, 0);
        let result = fast_policy(3)
            .nonce(&query, "0xabc", &endpoints(&urls))
            .await;
        assert!(result.is_indeterminate());
        assert_eq!(result.value_or_default(), 0);
        assert_eq!(query.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn empty_endpoint_list_is_indeterminate() {
        let query = ScriptedQuery::new(&[], 5);
        let result = fast_policy(2).balance(&query, "0xabc", &[]).await;
        assert!(result.is_indeterminate());
        assert_eq!(query.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_after_final_attempt() {
        let query = ScriptedQuery::new(&["https://a"], 0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1000));
        let started = tokio::time::Instant::now();
        let result = policy.balance(&query, "0xabc", &endpoints(&["https://a"])).await;
        assert!(result.is_indeterminate());
        // One backoff of 1s between the two rounds, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(2000));
    }
}
