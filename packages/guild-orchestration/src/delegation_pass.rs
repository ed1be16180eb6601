//! Delegation pass
//!
//! Reset → snapshot → resolve → write back. Topological anomalies (errors,
//! cycles) are results, not failures; only failed writes count against the
//! error cap.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use guild_core::{AssetKey, DelegationResolver};
use guild_storage::AccountRepository;

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegationReport {
    pub accounts: usize,
    pub delegation_errors: usize,
    pub cycle_members: usize,
    pub cycles: usize,
    pub council_ready: usize,
    pub votes_cast: i64,
    pub write_errors: Vec<String>,
    pub duration_ms: u64,
}

/// Collects failed derived-state writes for one pass
pub(crate) struct WriteErrors {
    pass: &'static str,
    limit: usize,
    errors: Vec<String>,
}

impl WriteErrors {
    pub(crate) fn new(pass: &'static str, limit: usize) -> Self {
        Self {
            pass,
            limit,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record<T, E: std::fmt::Display>(
        &mut self,
        account_id: &str,
        result: std::result::Result<T, E>,
    ) {
        if let Err(e) = result {
            self.errors.push(format!("{}: {}", account_id, e));
        }
    }

    /// Fail when more than `limit` writes failed, warn otherwise
    pub(crate) fn finish(self) -> Result<Vec<String>> {
        if self.errors.len() > self.limit {
            return Err(OrchestratorError::WriteErrorsExceeded {
                pass: self.pass,
                errors: self.errors.len(),
                limit: self.limit,
            });
        }
        if !self.errors.is_empty() {
            warn!(
                pass = self.pass,
                errors = self.errors.len(),
                first = %self.errors[0],
                "Pass completed with write errors"
            );
        }
        Ok(self.errors)
    }
}

pub async fn run_delegation_pass(
    repository: &dyn AccountRepository,
    governance_asset: &AssetKey,
    max_write_errors: usize,
) -> Result<DelegationReport> {
    let start = Instant::now();

    repository.reset_delegation_state().await?;
    let rows = repository.delegation_rows(governance_asset).await?;
    let outcome = DelegationResolver::new(&rows).resolve();

    let mut writes = WriteErrors::new("delegation", max_write_errors);

    for account_id in &outcome.delegation_errors {
        writes.record(account_id, repository.set_delegation_error(account_id).await);
    }
    for mark in &outcome.cycles {
        writes.record(
            &mark.account_id,
            repository.set_delegation_cycle(&mark.account_id, &mark.path).await,
        );
    }
    for (account_id, votes) in &outcome.received_votes {
        writes.record(account_id, repository.set_received_votes(account_id, *votes).await);
    }

    let report = DelegationReport {
        accounts: rows.len(),
        delegation_errors: outcome.delegation_errors.len(),
        cycle_members: outcome.cycles.len(),
        cycles: outcome.cycle_count(),
        council_ready: outcome.received_votes.len(),
        votes_cast: outcome.received_votes.values().sum(),
        write_errors: writes.finish()?,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        accounts = report.accounts,
        delegation_errors = report.delegation_errors,
        cycles = report.cycles,
        council_ready = report.council_ready,
        votes_cast = report.votes_cast,
        "Delegation pass completed"
    );
    Ok(report)
}
