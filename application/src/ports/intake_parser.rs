//! Intake parser port
//!
//! Turns pasted free text (or JSON) into case field assignments.

use super::assessment_provider::ProviderError;
use async_trait::async_trait;
use ckm_domain::CaseDiff;

#[async_trait]
pub trait IntakeParser: Send + Sync {
    /// Parse `text` into a diff; an empty diff means nothing was recognized
    async fn parse(&self, text: &str) -> Result<CaseDiff, ProviderError>;
}
