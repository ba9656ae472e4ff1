//! Structured synthesis directives, the provider request and the stage output

use super::agreement::Agreement;
use super::conflict::{ConflictPriority, Resolution};
use super::overrides::SafetyOverride;
use super::snapshot::Snapshot;
use super::validation::ValidationIssue;
use crate::assessment::value_objects::JoinedAssessment;
use crate::case::entities::FinalCase;
use serde::Serialize;

/// Instructions the synthesis provider receives alongside the role payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisDirectives {
    /// Merge repeated recommendations into one item
    pub deduplicate: bool,
    pub agreements: Vec<Agreement>,
    /// Sentences that must appear verbatim in Key Facts
    pub missing_flags: Vec<String>,
    pub conflict_priority: Vec<ConflictPriority>,
    pub resolutions: Vec<Resolution>,
    pub safety_overrides: Vec<SafetyOverride>,
    pub word_limit: usize,
    /// Decision D must be "Yes" (peri-operative cases)
    pub decision_required: bool,
    /// Issues of the previous attempt; empty on the first one
    pub feedback: Vec<ValidationIssue>,
}

/// One call to the synthesis provider
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub case: FinalCase,
    pub joined: JoinedAssessment,
    pub directives: SynthesisDirectives,
    /// 1-based attempt number
    pub attempt: u32,
}

/// What the stage hands to the output gate
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    pub snapshot: Snapshot,
    pub agreements: Vec<Agreement>,
    pub resolutions: Vec<Resolution>,
    pub fired_overrides: Vec<SafetyOverride>,
    /// Provider calls made, including retries
    pub attempts: u32,
}
