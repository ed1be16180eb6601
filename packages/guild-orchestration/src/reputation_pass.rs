//! Reputation pass and graph queries

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use guild_core::{ReputationConfig, ReputationGraph, ReputationGraphBuilder};
use guild_storage::AccountRepository;

use crate::delegation_pass::WriteErrors;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    pub rating_edges: usize,
    pub rated_accounts: usize,
    pub write_errors: Vec<String>,
    pub duration_ms: u64,
}

/// Score every rated account and replace the stored scores wholesale.
///
/// Own scores shown on rater nodes come from the previous run, which is why
/// rater info is read before the old scores are cleared.
pub async fn run_reputation_pass(
    repository: &dyn AccountRepository,
    config: &ReputationConfig,
    max_write_errors: usize,
) -> Result<ReputationReport> {
    let start = Instant::now();

    let edges = repository.rating_edges().await?;
    let infos = repository.rater_infos().await?;
    let builder = ReputationGraphBuilder::new(*config, &edges);
    let scores = builder.score_all(&infos, Utc::now());

    repository.clear_reputation_scores().await?;
    let mut writes = WriteErrors::new("reputation", max_write_errors);
    for score in &scores {
        writes.record(&score.account_id, repository.save_reputation_score(score).await);
    }

    let report = ReputationReport {
        rating_edges: edges.len(),
        rated_accounts: scores.len(),
        write_errors: writes.finish()?,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        rating_edges = report.rating_edges,
        rated_accounts = report.rated_accounts,
        "Reputation pass completed"
    );
    Ok(report)
}

/// Two-level reputation graph for one account, from the current store
pub async fn reputation_graph(
    repository: &dyn AccountRepository,
    config: &ReputationConfig,
    target: &str,
) -> Result<ReputationGraph> {
    let edges = repository.rating_edges().await?;
    let infos = repository.rater_infos().await?;
    let builder = ReputationGraphBuilder::new(*config, &edges);
    Ok(builder.build(target, &infos, Utc::now()))
}
