//! Full resync driver
//!
//! Runs the stages in order: collect holders, fetch accounts, delegation
//! pass, reputation pass. Each stage sees the state the previous one
//! persisted. The job ends in exactly one terminal state; stage errors are
//! folded into the job instead of being returned, so callers always get the
//! partial report back.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use guild_storage::AccountRepository;

use crate::config::SyncConfig;
use crate::delegation_pass::{run_delegation_pass, DelegationReport};
use crate::error::{OrchestratorError, Result};
use crate::fetch::{AccountFetchOrchestrator, FetchReport};
use crate::job::{JobStateMachine, ResyncJob, ResyncStage};
use crate::ledger::{collect_holders, LedgerClient};
use crate::reputation_pass::{run_reputation_pass, ReputationReport};

/// What each completed stage produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResyncReport {
    pub holders: usize,
    /// Stored accounts that were no longer resync targets
    pub pruned: usize,
    pub fetch: Option<FetchReport>,
    pub delegation: Option<DelegationReport>,
    pub reputation: Option<ReputationReport>,
    pub duration_ms: u64,
}

impl ResyncReport {
    pub fn accounts_synced(&self) -> usize {
        self.fetch.as_ref().map_or(0, |f| f.succeeded)
    }
}

pub struct ResyncOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn AccountRepository>,
    config: SyncConfig,
}

impl ResyncOrchestrator {
    /// Rejects an invalid config up front
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        repository: Arc<dyn AccountRepository>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger,
            repository,
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute one full resync.
    ///
    /// Returns `Err` only when the job itself cannot transition; stage
    /// failures and cancellation are reported through the job state.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(ResyncJob, ResyncReport)> {
        let start = Instant::now();
        let mut sm = JobStateMachine::new(ResyncJob::new_queued());
        let job_id = sm.job().id;

        info!(job_id = %job_id, "Starting resync");
        sm.start(ResyncStage::CollectHolders)?;

        let mut report = ResyncReport::default();
        let outcome = self.run_stages(&mut sm, &mut report, &cancel).await;
        report.duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                sm.complete(report.accounts_synced())?;
                info!(
                    job_id = %job_id,
                    holders = report.holders,
                    pruned = report.pruned,
                    accounts_synced = report.accounts_synced(),
                    duration_ms = report.duration_ms,
                    "Resync completed"
                );
            }
            Err(e) if e.is_cancelled() => {
                warn!(job_id = %job_id, reason = %e, "Resync cancelled");
                sm.cancel(e.to_string())?;
            }
            Err(e) => {
                error!(
                    job_id = %job_id,
                    error = %e,
                    category = %e.category(),
                    "Resync failed"
                );
                sm.fail(e.to_string(), e.category())?;
            }
        }

        Ok((sm.into_job(), report))
    }

    async fn run_stages(
        &self,
        sm: &mut JobStateMachine,
        report: &mut ResyncReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Stage 1: holders
        let holders = self.collect_targets().await?;
        report.holders = holders.len();

        // Stage 2: fetch
        check_cancelled(cancel, ResyncStage::FetchAccounts)?;
        sm.advance(ResyncStage::FetchAccounts)?;
        let fetcher = AccountFetchOrchestrator::new(
            self.ledger.clone(),
            self.repository.clone(),
            self.config.clone(),
        );
        report.fetch = Some(fetcher.run(holders.clone(), cancel).await?);

        // Accounts that left the holder list would keep feeding stale
        // balances and delegations into the next stages
        let pruned = self.repository.prune_accounts(&holders).await?;
        if !pruned.is_empty() {
            info!(pruned = pruned.len(), "Pruned departed accounts");
        }
        report.pruned = pruned.len();

        // Stage 3: delegation
        check_cancelled(cancel, ResyncStage::Delegation)?;
        sm.advance(ResyncStage::Delegation)?;
        report.delegation = Some(
            run_delegation_pass(
                self.repository.as_ref(),
                &self.config.governance_asset(),
                self.config.max_write_errors,
            )
            .await?,
        );

        // Stage 4: reputation
        check_cancelled(cancel, ResyncStage::Reputation)?;
        sm.advance(ResyncStage::Reputation)?;
        report.reputation = Some(
            run_reputation_pass(
                self.repository.as_ref(),
                &self.config.reputation,
                self.config.max_write_errors,
            )
            .await?,
        );

        Ok(())
    }

    /// Governance holders plus the association account, deduplicated
    async fn collect_targets(&self) -> Result<Vec<String>> {
        let asset = self.config.governance_asset();
        let mut targets =
            collect_holders(self.ledger.as_ref(), &asset, self.config.holder_page_size).await?;
        targets.push(self.config.association_account.clone());
        targets.sort();
        targets.dedup();

        info!(asset = %asset, targets = targets.len(), "Collected resync targets");
        Ok(targets)
    }
}

fn check_cancelled(cancel: &CancellationToken, next: ResyncStage) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(OrchestratorError::cancelled(format!(
            "stopped before stage {}",
            next
        )));
    }
    Ok(())
}
