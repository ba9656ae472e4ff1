//! Assessment provider port
//!
//! Defines how a specialist role's assessment is obtained. The payload is
//! opaque text; the board never interprets it beyond line-level heuristics.

use async_trait::async_trait;
use ckm_domain::AssessmentRequest;
use thiserror::Error;

/// Errors that can occur while calling any provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Produces one role's assessment of a finalized case
///
/// Implementations (adapters) live in the infrastructure layer. Each call
/// receives its own immutable request; calls for different roles run
/// concurrently.
#[async_trait]
pub trait AssessmentProvider: Send + Sync {
    async fn assess(&self, request: &AssessmentRequest) -> Result<String, ProviderError>;
}
