//! Bounded-concurrency account fetch
//!
//! Each unit of work fetches one account, decodes it and replaces it in the
//! repository. At most `max_in_flight` units run at once; a unit failure is
//! recorded and the batch carries on. Only the aggregate failure rate can
//! fail the batch, and nothing already persisted is rolled back.
//!
//! Cancellation is observed while waiting for a permit: once the token
//! fires, no further units are dispatched and the batch returns
//! [`OrchestratorError::Cancelled`]. Units already running keep the token
//! and may finish on their own.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use guild_storage::AccountRepository;

use crate::config::SyncConfig;
use crate::error::{OrchestratorError, Result};
use crate::ledger::LedgerClient;

/// One failed unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub account_id: String,
    pub error: String,
}

/// Outcome of a batch that stayed under the failure threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FetchFailure>,
    pub duration_ms: u64,
}

impl FetchReport {
    pub fn failure_rate(&self) -> f64 {
        failure_rate(self.failed, self.total)
    }
}

fn failure_rate(failed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    }
}

pub struct AccountFetchOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn AccountRepository>,
    config: SyncConfig,
}

impl AccountFetchOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        repository: Arc<dyn AccountRepository>,
        config: SyncConfig,
    ) -> Self {
        Self {
            ledger,
            repository,
            config,
        }
    }

    /// Fetch, decode and persist every account in `account_ids`.
    ///
    /// Duplicate ids are processed once.
    pub async fn run(
        &self,
        mut account_ids: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<FetchReport> {
        let start = Instant::now();
        account_ids.sort();
        account_ids.dedup();
        let total = account_ids.len();

        info!(
            total,
            max_in_flight = self.config.max_in_flight,
            "Starting account fetch batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let failures: Arc<Mutex<Vec<FetchFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::with_capacity(total);

        for account_id in account_ids {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(dispatched = tasks.len(), total, "Fetch batch cancelled");
                    return Err(OrchestratorError::cancelled(format!(
                        "fetch batch stopped after dispatching {}/{} accounts",
                        tasks.len(),
                        total
                    )));
                }
                permit = semaphore.clone().acquire_owned() => permit.map_err(|_| {
                    OrchestratorError::cancelled("fetch permit pool closed")
                })?,
            };

            let ledger = self.ledger.clone();
            let repository = self.repository.clone();
            let failures = failures.clone();
            let association_account = self.config.association_account.clone();
            let cancel = cancel.clone();
            let task_account = account_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = sync_account(
                    ledger.as_ref(),
                    repository.as_ref(),
                    &task_account,
                    &association_account,
                    &cancel,
                )
                .await;

                if let Err(e) = result {
                    debug!(account = %task_account, error = %e, "Account sync failed");
                    failures.lock().push(FetchFailure {
                        account_id: task_account,
                        error: e.to_string(),
                    });
                }
            });
            tasks.push((account_id, handle));
        }

        // Wait for all units (join barrier)
        let (ids, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (account_id, result) in ids.into_iter().zip(results) {
            if let Err(join_err) = result {
                error!(account = %account_id, error = %join_err, "Account sync task panicked");
                failures.lock().push(FetchFailure {
                    account_id,
                    error: format!("task panicked: {}", join_err),
                });
            }
        }

        let mut failures = std::mem::take(&mut *failures.lock());
        failures.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        let failed = failures.len();
        let report = FetchReport {
            total,
            succeeded: total - failed,
            failed,
            failures,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if failed > 0 {
            let sample: Vec<&str> = report
                .failures
                .iter()
                .take(self.config.failure_sample_size)
                .map(|f| f.account_id.as_str())
                .collect();
            warn!(
                failed,
                total,
                failure_rate = report.failure_rate(),
                sample = ?sample,
                "Account fetch batch had failures"
            );
        }

        if report.failure_rate() > self.config.failure_threshold {
            error!(
                failed,
                total,
                threshold = self.config.failure_threshold,
                "Fetch failure rate above threshold"
            );
            return Err(OrchestratorError::FailureThresholdExceeded {
                failed,
                total,
                threshold: self.config.failure_threshold,
            });
        }

        info!(
            succeeded = report.succeeded,
            failed,
            duration_ms = report.duration_ms,
            "Account fetch batch completed"
        );
        Ok(report)
    }
}

/// One unit: fetch → decode → replace
async fn sync_account(
    ledger: &dyn LedgerClient,
    repository: &dyn AccountRepository,
    account_id: &str,
    association_account: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let detail = ledger.fetch_account(account_id, cancel).await?;
    let record = detail.to_record();
    repository.replace_account(&record).await?;

    if account_id == association_account {
        let tags = detail.association_tags();
        debug!(tags = tags.len(), "Association tags decoded");
        repository.replace_association_tags(&tags).await?;
    }
    Ok(())
}
