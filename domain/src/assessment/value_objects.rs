//! Assessment value objects - requests, per-role results and the joined set.
//!
//! - [`AssessmentRequest`] - immutable (role, case) pair sent to a provider
//! - [`AssessmentResult`] - one role's payload and completion status
//! - [`JoinedAssessment`] - all results of one submission in role-priority order

use super::role::{Role, RoleSpec};
use crate::case::entities::FinalCase;
use crate::case::field::CaseField;
use serde::{Deserialize, Serialize};

/// Request sent to one role's provider
#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    pub role: Role,
    pub case: FinalCase,
    /// Critical fields absent from the case, passed as the missing-data directive
    pub missing_fields: Vec<CaseField>,
}

impl AssessmentRequest {
    pub fn new(role: Role, case: FinalCase, missing_fields: Vec<CaseField>) -> Self {
        Self {
            role,
            case,
            missing_fields,
        }
    }
}

/// Completion status of a role's assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentStatus {
    Ok,
    Failed,
    TimedOut,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Ok => "ok",
            AssessmentStatus::Failed => "failed",
            AssessmentStatus::TimedOut => "timed_out",
        }
    }
}

/// Result of one role's assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub role: Role,
    /// Raw, opaque provider text; empty unless `status` is `Ok`
    pub payload: String,
    pub status: AssessmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl AssessmentResult {
    pub fn ok(role: Role, payload: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            role,
            payload: payload.into(),
            status: AssessmentStatus::Ok,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(role: Role, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            role,
            payload: String::new(),
            status: AssessmentStatus::Failed,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn timed_out(role: Role, elapsed_ms: u64) -> Self {
        Self {
            role,
            payload: String::new(),
            status: AssessmentStatus::TimedOut,
            error: Some("assessment timed out".to_string()),
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AssessmentStatus::Ok
    }
}

/// All results for one submission, ordered by role priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedAssessment {
    results: Vec<AssessmentResult>,
}

impl JoinedAssessment {
    /// Order `results` by the priority declared in `roles`.
    ///
    /// Roles sharing a priority keep their declaration order. Every
    /// registered role gets exactly one entry: a role with no result
    /// is recorded as `Failed`, results for unregistered roles are dropped,
    /// and duplicates keep the first result seen.
    pub fn assemble(roles: &[RoleSpec], mut results: Vec<AssessmentResult>) -> Self {
        let mut ordered: Vec<&RoleSpec> = roles.iter().collect();
        // stable: equal priorities keep declaration order
        ordered.sort_by_key(|spec| spec.priority);

        let mut joined = Vec::with_capacity(ordered.len());
        for spec in ordered {
            if joined.iter().any(|r: &AssessmentResult| r.role == spec.role) {
                continue;
            }
            let result = match results.iter().position(|r| r.role == spec.role) {
                Some(idx) => results.swap_remove(idx),
                None => AssessmentResult::failed(spec.role.clone(), "no result produced", 0),
            };
            joined.push(result);
        }
        Self { results: joined }
    }

    pub fn results(&self) -> &[AssessmentResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, role: &Role) -> Option<&AssessmentResult> {
        self.results.iter().find(|r| &r.role == role)
    }

    /// Successful results in priority order
    pub fn successful(&self) -> impl Iterator<Item = &AssessmentResult> {
        self.results.iter().filter(|r| r.is_ok())
    }

    /// Roles whose assessment did not complete
    pub fn incomplete_roles(&self) -> Vec<&Role> {
        self.results
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| &r.role)
            .collect()
    }
}
