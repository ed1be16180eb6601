//! Error types for guild-core
//!
//! The parser and graph builders never fail; these errors come from
//! constructing domain values out of untrusted strings.

use thiserror::Error;

/// Main error type for guild-core operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Decimal amount could not be parsed as a 7-digit fixed point value
    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    /// Rating letter outside the closed A..D set
    #[error("Invalid rating: {0}")]
    InvalidRating(String),
}

impl CoreError {
    pub fn invalid_amount(value: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
