//! Synthesis provider port

use super::assessment_provider::ProviderError;
use async_trait::async_trait;
use ckm_domain::SynthesisRequest;

/// Merges role payloads into Snapshot-template text
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, ProviderError>;
}
