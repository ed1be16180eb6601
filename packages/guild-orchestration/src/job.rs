use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resync stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResyncStage {
    CollectHolders,
    FetchAccounts,
    Delegation,
    Reputation,
}

impl ResyncStage {
    /// Stages in execution order
    pub const ALL: [ResyncStage; 4] = [
        ResyncStage::CollectHolders,
        ResyncStage::FetchAccounts,
        ResyncStage::Delegation,
        ResyncStage::Reputation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResyncStage::CollectHolders => "collect_holders",
            ResyncStage::FetchAccounts => "fetch_accounts",
            ResyncStage::Delegation => "delegation",
            ResyncStage::Reputation => "reputation",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "collect_holders" => Ok(ResyncStage::CollectHolders),
            "fetch_accounts" => Ok(ResyncStage::FetchAccounts),
            "delegation" => Ok(ResyncStage::Delegation),
            "reputation" => Ok(ResyncStage::Reputation),
            _ => Err(OrchestratorError::parse(format!("Invalid resync stage: {}", s))),
        }
    }
}

impl std::fmt::Display for ResyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state enum
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        queued_at: DateTime<Utc>,
    },
    Running {
        started_at: DateTime<Utc>,
        current_stage: ResyncStage,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        accounts_synced: usize,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        error: String,
        error_category: ErrorCategory,
        failed_stage: ResyncStage,
    },
    Cancelled {
        cancelled_at: DateTime<Utc>,
        reason: String,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. } | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }
}

/// One full resync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncJob {
    pub id: Uuid,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResyncJob {
    pub fn new_queued() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: JobState::Queued { queued_at: now },
            created_at: now,
            updated_at: now,
        }
    }
}

/// Job state machine for transitions
pub struct JobStateMachine {
    job: ResyncJob,
}

impl JobStateMachine {
    pub fn new(job: ResyncJob) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &ResyncJob {
        &self.job
    }

    pub fn into_job(self) -> ResyncJob {
        self.job
    }

    fn invalid(&self, to: &str) -> OrchestratorError {
        OrchestratorError::InvalidStateTransition {
            from: self.job.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: QUEUED → RUNNING
    pub fn start(&mut self, first_stage: ResyncStage) -> Result<()> {
        match &self.job.state {
            JobState::Queued { .. } => {
                let now = Utc::now();
                self.job.state = JobState::Running {
                    started_at: now,
                    current_stage: first_stage,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Update current stage (for running jobs)
    pub fn advance(&mut self, stage: ResyncStage) -> Result<()> {
        match &mut self.job.state {
            JobState::Running { current_stage, .. } => {
                *current_stage = stage;
                self.job.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(self.invalid("advance")),
        }
    }

    /// Transition: RUNNING → COMPLETED
    pub fn complete(&mut self, accounts_synced: usize) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds().max(0) as u64;

                self.job.state = JobState::Completed {
                    started_at: *started_at,
                    completed_at: now,
                    duration_ms,
                    accounts_synced,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: RUNNING → FAILED
    pub fn fail(&mut self, error: String, error_category: ErrorCategory) -> Result<()> {
        match &self.job.state {
            JobState::Running {
                started_at,
                current_stage,
            } => {
                let now = Utc::now();
                self.job.state = JobState::Failed {
                    started_at: *started_at,
                    failed_at: now,
                    error,
                    error_category,
                    failed_stage: *current_stage,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    /// Transition: * → CANCELLED
    pub fn cancel(&mut self, reason: String) -> Result<()> {
        if self.job.state.is_terminal() {
            return Err(self.invalid("cancelled"));
        }

        let now = Utc::now();
        self.job.state = JobState::Cancelled {
            cancelled_at: now,
            reason,
        };
        self.job.updated_at = now;
        Ok(())
    }
}
