use guild_core::ConfigError;
use guild_storage::StorageError;
use thiserror::Error;

use crate::ledger::LedgerError;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Failure threshold exceeded: {failed}/{total} accounts failed (threshold {threshold})")]
    FailureThresholdExceeded {
        failed: usize,
        total: usize,
        threshold: f64,
    },

    #[error("{pass} pass: {errors} write errors (limit {limit})")]
    WriteErrorsExceeded {
        pass: &'static str,
        errors: usize,
        limit: usize,
    },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl OrchestratorError {
    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled(context.into())
    }

    /// Classification used by the job state machine
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrchestratorError::Cancelled(_) => ErrorCategory::Cancelled,
            OrchestratorError::Ledger(LedgerError::Cancelled) => ErrorCategory::Cancelled,
            OrchestratorError::Storage(e) if e.kind.is_transient() => ErrorCategory::Transient,
            OrchestratorError::Ledger(e) if e.is_transient() => ErrorCategory::Transient,
            OrchestratorError::FailureThresholdExceeded { .. }
            | OrchestratorError::WriteErrorsExceeded { .. } => ErrorCategory::Transient,
            _ => ErrorCategory::Permanent,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }
}

/// Error category for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error - a later resync may succeed (e.g., ledger timeout)
    Transient,
    /// Permanent error - needs an operator (e.g., bad config, corrupt store)
    Permanent,
    /// Run was cancelled on purpose
    Cancelled,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(ErrorCategory::Transient),
            "permanent" => Ok(ErrorCategory::Permanent),
            "cancelled" => Ok(ErrorCategory::Cancelled),
            _ => Err(OrchestratorError::parse(format!(
                "Invalid error category: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
