use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::chains::ChainConfig;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    BalanceResult, ChainCheck, CheckMode, CheckRecord, ExecutionStrategy, ProgressState,
    UsageStatus, Wallet,
};
use crate::rpc::{ChainQuery, RetryPolicy};

// ==================== REQUEST ====================
/// Validated input of one run. Wallets and chains are snapshotted for its duration.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub wallets: Arc<Vec<Wallet>>,
    pub chains: Arc<Vec<ChainConfig>>,
    pub worker_count: usize,
    pub mode: CheckMode,
    pub strategy: ExecutionStrategy,
}

impl CheckRequest {
    pub fn new(
        wallets: Vec<Wallet>,
        chains: Vec<ChainConfig>,
        worker_count: usize,
        mode: CheckMode,
        strategy: ExecutionStrategy,
    ) -> Result<Self> {
        if wallets.is_empty() {
            return Err(AppError::BadRequest("No wallets to check".to_string()));
        }
        if chains.is_empty() {
            return Err(AppError::BadRequest("Select at least one chain".to_string()));
        }
        if worker_count == 0 {
            return Err(AppError::BadRequest(
                "Worker count must be at least 1".to_string(),
            ));
        }
        if let Some(chain) = chains.iter().find(|c| c.endpoints.is_empty()) {
            return Err(AppError::BadRequest(format!(
                "No RPC endpoint configured for chain {}",
                chain.id
            )));
        }

        Ok(Self {
            wallets: Arc::new(wallets),
            chains: Arc::new(chains),
            worker_count,
            mode,
            strategy,
        })
    }

    /// N × C queries.
    pub fn total(&self) -> usize {
        self.wallets.len() * self.chains.len()
    }

    /// Queries between two batch delays: `ceil(N*C / W)`.
    pub fn batch_size(&self) -> usize {
        self.total().div_ceil(self.worker_count).max(1)
    }
}

// ==================== RUN HANDLE ====================
struct RunState {
    current: AtomicUsize,
    total: usize,
    cancelled: AtomicBool,
    records: RwLock<Vec<CheckRecord>>,
}

/// Shared view of a run: progress, cancel flag and the records gathered so far.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<RunState>,
}

impl RunHandle {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(RunState {
                current: AtomicUsize::new(0),
                total,
                cancelled: AtomicBool::new(false),
                records: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn progress(&self) -> ProgressState {
        ProgressState {
            current: self.inner.current.load(Ordering::SeqCst),
            total: self.inner.total,
        }
    }

    /// Cooperative; queries already in flight still complete.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub async fn records(&self) -> Vec<CheckRecord> {
        self.inner.records.read().await.clone()
    }

    pub async fn record_count(&self) -> usize {
        self.inner.records.read().await.len()
    }

    // Progress never moves backwards.
    fn set_progress(&self, current: usize) {
        self.inner.current.fetch_max(current, Ordering::SeqCst);
    }

    fn advance(&self) -> usize {
        self.inner.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn push(&self, record: CheckRecord) {
        self.inner.records.write().await.push(record);
    }

    async fn sort_records(&self) {
        self.inner
            .records
            .write()
            .await
            .sort_by_key(|r| (r.wallet_index, r.chain_index));
    }
}

// ==================== ORCHESTRATOR ====================
/// Batch orchestrator: runs every (wallet, chain) pair of a request.
pub struct BalanceChecker {
    query: Arc<dyn ChainQuery>,
    policy: RetryPolicy,
    batch_delay: Duration,
}

impl BalanceChecker {
    pub fn new(query: Arc<dyn ChainQuery>, policy: RetryPolicy, batch_delay: Duration) -> Self {
        Self {
            query,
            policy,
            batch_delay,
        }
    }

    pub fn from_config(query: Arc<dyn ChainQuery>, config: &Config) -> Self {
        Self::new(query, RetryPolicy::from_config(config), config.batch_delay())
    }

    /// Runs to completion or cancellation. Per-pair failures end up as
    /// indeterminate records, never as an error.
    pub async fn run(&self, request: &CheckRequest, handle: &RunHandle) -> Result<()> {
        tracing::info!(
            "Starting {:?} check: {} wallet(s) x {} chain(s), strategy {:?}, {} worker(s)",
            request.mode,
            request.wallets.len(),
            request.chains.len(),
            request.strategy,
            request.worker_count
        );

        match request.strategy {
            ExecutionStrategy::Sequential => self.run_sequential(request, handle).await,
            ExecutionStrategy::WorkerPool => self.run_pool(request, handle).await?,
        }

        let progress = handle.progress();
        if handle.is_cancelled() {
            tracing::info!(
                "Check cancelled at {}/{} queries",
                progress.current,
                progress.total
            );
        } else if progress.is_complete() {
            tracing::info!("Check finished: {} queries", progress.current);
        }
        Ok(())
    }

    async fn run_sequential(&self, request: &CheckRequest, handle: &RunHandle) {
        let chain_count = request.chains.len();
        let total = request.total();
        let batch_size = request.batch_size();

        'wallets: for (i, wallet) in request.wallets.iter().enumerate() {
            if handle.is_cancelled() {
                break;
            }

            for (j, chain) in request.chains.iter().enumerate() {
                if handle.is_cancelled() {
                    break 'wallets;
                }

                let check = check_pair(
                    self.query.as_ref(),
                    &self.policy,
                    request.mode,
                    wallet,
                    chain,
                    &chain.endpoints,
                )
                .await;
                handle
                    .push(CheckRecord {
                        wallet_index: i,
                        chain_index: j,
                        check,
                        checked_at: Utc::now(),
                    })
                    .await;

                let current = i * chain_count + j + 1;
                handle.set_progress(current);

                if current % batch_size == 0 && current < total && !self.batch_delay.is_zero() {
                    tokio::time::sleep(self.batch_delay).await;
                }
            }
        }
    }

    async fn run_pool(&self, request: &CheckRequest, handle: &RunHandle) -> Result<()> {
        let (item_tx, item_rx) = mpsc::unbounded_channel::<(usize, usize)>();
        for i in 0..request.wallets.len() {
            for j in 0..request.chains.len() {
                let _ = item_tx.send((i, j));
            }
        }
        drop(item_tx);

        let item_rx = Arc::new(Mutex::new(item_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<CheckRecord>();
        let workers = request.worker_count.min(request.total()).max(1);

        let mut tasks = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let item_rx = item_rx.clone();
            let result_tx = result_tx.clone();
            let query = self.query.clone();
            let wallets = request.wallets.clone();
            let chains = request.chains.clone();
            let mode = request.mode;
            let handle = handle.clone();

            tasks.push(tokio::spawn(async move {
                let policy = RetryPolicy::single_attempt();
                loop {
                    if handle.is_cancelled() {
                        break;
                    }
                    let next = item_rx.lock().await.recv().await;
                    let Some((i, j)) = next else {
                        break;
                    };
                    // Another worker may have cancelled while this one waited on the queue.
                    if handle.is_cancelled() {
                        break;
                    }

                    let wallet = &wallets[i];
                    let chain = &chains[j];
                    let primary: Vec<String> =
                        chain.primary_endpoint().map(str::to_string).into_iter().collect();
                    let check =
                        check_pair(query.as_ref(), &policy, mode, wallet, chain, &primary).await;

                    let record = CheckRecord {
                        wallet_index: i,
                        chain_index: j,
                        check,
                        checked_at: Utc::now(),
                    };
                    if result_tx.send(record).is_err() {
                        break;
                    }
                }
                tracing::debug!("Worker {} stopped", worker_id);
            }));
        }
        drop(result_tx);

        while let Some(record) = result_rx.recv().await {
            handle.push(record).await;
            handle.advance();
        }

        for joined in futures_util::future::join_all(tasks).await {
            joined.map_err(|e| AppError::Internal(format!("Check worker failed: {}", e)))?;
        }

        handle.sort_records().await;
        Ok(())
    }
}

/// One (wallet, chain) lookup. Usage mode queries the balance, then the nonce.
async fn check_pair(
    query: &dyn ChainQuery,
    policy: &RetryPolicy,
    mode: CheckMode,
    wallet: &Wallet,
    chain: &ChainConfig,
    endpoints: &[String],
) -> ChainCheck {
    let balance = policy.balance(query, &wallet.address, endpoints).await;
    match mode {
        CheckMode::Balance => ChainCheck::Balance(BalanceResult::new(
            &wallet.address,
            &chain.id,
            &chain.symbol,
            balance,
        )),
        CheckMode::Usage => {
            let nonce = policy.nonce(query, &wallet.address, endpoints).await;
            ChainCheck::Usage(UsageStatus::new(
                &wallet.address,
                &chain.id,
                &chain.symbol,
                balance,
                nonce,
            ))
        }
    }
}
