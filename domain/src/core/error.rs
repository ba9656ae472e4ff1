//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Case is final and can no longer be modified")]
    CaseFrozen,

    #[error("Invalid value for field {field}: {value}")]
    InvalidFieldValue { field: String, value: String },

    #[error("Unknown case field: {0}")]
    UnknownField(String),

    #[error("Invalid safety override: {0}")]
    InvalidOverride(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
