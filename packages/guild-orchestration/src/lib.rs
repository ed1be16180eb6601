/*
 * Guild Orchestration - ledger resync pipeline
 *
 * Stages:
 * - Holder collection (paginated ledger listing)
 * - Account fetch (bounded concurrency, failure-rate threshold)
 * - Delegation pass (cycles, errors, council vote tally)
 * - Reputation pass (weighted scores for every rated account)
 *
 * Progress is tracked by a resync job state machine; cancellation is
 * cooperative through a CancellationToken.
 */

pub mod config;
pub mod delegation_pass;
pub mod error;
pub mod fetch;
pub mod job;
pub mod ledger;
pub mod orchestrator;
pub mod reputation_pass;

pub use config::{SyncConfig, DEFAULT_ASSOCIATION_ACCOUNT, DEFAULT_GOVERNANCE_ASSET_CODE};
pub use delegation_pass::{run_delegation_pass, DelegationReport};
pub use error::{ErrorCategory, OrchestratorError, Result};
pub use fetch::{AccountFetchOrchestrator, FetchFailure, FetchReport};
pub use job::{JobState, JobStateMachine, ResyncJob, ResyncStage};
pub use ledger::{collect_holders, AccountDetail, LedgerClient, LedgerError};
pub use orchestrator::{ResyncOrchestrator, ResyncReport};
pub use reputation_pass::{reputation_graph, run_reputation_pass, ReputationReport};
