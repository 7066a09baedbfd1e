use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{CheckMode, ExecutionStrategy, ProgressState, RunStatus, Wallet};
use crate::services::balance_checker::{BalanceChecker, CheckRequest, RunHandle};
use crate::services::report::{build_reports, WalletReport};
use crate::utils::new_id;

/// A started run and everything needed to report on it afterwards.
#[derive(Clone)]
pub struct CheckRun {
    pub id: String,
    seq: u64,
    pub request: CheckRequest,
    pub handle: RunHandle,
    /// Name of the wallet file the run was started from, if any.
    pub source: Option<String>,
    pub started_at: DateTime<Utc>,
    status: Arc<RwLock<RunStatus>>,
    finished_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl CheckRun {
    pub async fn status(&self) -> RunStatus {
        self.status.read().await.clone()
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.request.wallets
    }

    pub async fn reports(&self) -> Vec<WalletReport> {
        build_reports(self.wallets(), &self.handle.records().await)
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let progress = self.handle.progress();
        RunSnapshot {
            id: self.id.clone(),
            status: self.status().await,
            mode: self.request.mode,
            strategy: self.request.strategy,
            worker_count: self.request.worker_count,
            chains: self.request.chains.iter().map(|c| c.id.clone()).collect(),
            wallet_count: self.request.wallets.len(),
            record_count: self.handle.record_count().await,
            percent: progress.percent(),
            progress,
            source: self.source.clone(),
            started_at: self.started_at,
            finished_at: *self.finished_at.read().await,
        }
    }

    async fn finish(&self, status: RunStatus) {
        *self.status.write().await = status;
        *self.finished_at.write().await = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    pub mode: CheckMode,
    pub strategy: ExecutionStrategy,
    pub worker_count: usize,
    pub chains: Vec<String>,
    pub wallet_count: usize,
    pub record_count: usize,
    pub progress: ProgressState,
    pub percent: f64,
    pub source: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// In-memory registry of runs started through the API.
///
/// Running runs are always kept. Of the finished ones only the
/// `max_finished` most recently started survive.
#[derive(Clone)]
pub struct CheckRunManager {
    runs: Arc<RwLock<HashMap<String, CheckRun>>>,
    next_seq: Arc<AtomicU64>,
    max_finished: usize,
}

impl CheckRunManager {
    pub fn new(max_finished: usize) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            max_finished,
        }
    }

    /// Registers the run and drives it on a background task.
    pub async fn start(
        &self,
        checker: Arc<BalanceChecker>,
        request: CheckRequest,
        source: Option<String>,
    ) -> CheckRun {
        let run = CheckRun {
            id: new_id(),
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            handle: RunHandle::new(request.total()),
            request,
            source,
            started_at: Utc::now(),
            status: Arc::new(RwLock::new(RunStatus::Running)),
            finished_at: Arc::new(RwLock::new(None)),
        };
        let tracked = {
            let mut runs = self.runs.write().await;
            runs.insert(run.id.clone(), run.clone());
            runs.len()
        };
        tracing::info!("Started check run {} ({} tracked)", run.id, tracked);

        let task_run = run.clone();
        let manager = self.clone();
        tokio::spawn(async move {
            let job_run = task_run.clone();
            let job = tokio::spawn(async move {
                checker.run(&job_run.request, &job_run.handle).await
            });

            let status = match job.await {
                Ok(Ok(())) if task_run.handle.is_cancelled() => RunStatus::Cancelled,
                Ok(Ok(())) => RunStatus::Completed,
                Ok(Err(e)) => {
                    tracing::error!("Check run {} failed: {}", task_run.id, e);
                    RunStatus::Failed(e.to_string())
                }
                Err(e) => {
                    tracing::error!("Check run {} aborted: {}", task_run.id, e);
                    RunStatus::Failed(format!("Check task aborted: {}", e))
                }
            };
            task_run.finish(status).await;
            manager.evict_finished().await;
        });

        run
    }

    pub async fn get(&self, id: &str) -> Result<CheckRun> {
        self.runs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Check run {}", id)))
    }

    pub async fn cancel(&self, id: &str) -> Result<CheckRun> {
        let run = self.get(id).await?;
        run.handle.cancel();
        tracing::info!("Cancel requested for check run {}", id);
        Ok(run)
    }

    /// Drops the run and its results. A running run is cancelled first.
    pub async fn remove(&self, id: &str) -> Result<CheckRun> {
        let run = self
            .runs
            .write()
            .await
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Check run {}", id)))?;
        run.handle.cancel();
        tracing::info!("Removed check run {}", id);
        Ok(run)
    }

    async fn evict_finished(&self) {
        let snapshot: Vec<CheckRun> = self.runs.read().await.values().cloned().collect();
        let mut finished = Vec::new();
        for run in snapshot {
            if run.status().await != RunStatus::Running {
                finished.push((run.seq, run.id));
            }
        }
        if finished.len() <= self.max_finished {
            return;
        }

        finished.sort_by(|a, b| b.0.cmp(&a.0));
        let mut runs = self.runs.write().await;
        for (_, id) in finished.into_iter().skip(self.max_finished) {
            runs.remove(&id);
            tracing::debug!("Evicted finished check run {}", id);
        }
    }
}
