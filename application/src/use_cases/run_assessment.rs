//! Run Assessment use case
//!
//! Fans one finalized case out to every registered role and joins the
//! results in role-priority order.

use crate::ports::assessment_provider::{AssessmentProvider, ProviderError};
use crate::ports::progress::{BoardPhase, NoProgress, ProgressNotifier};
use ckm_domain::{
    AssessmentRequest, AssessmentResult, AssessmentStatus, CaseField, FinalCase, JoinedAssessment,
    Role, RoleSpec,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that stop a fan-out as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("No roles configured")]
    NoRoles,

    #[error("Assessment cancelled")]
    Cancelled,
}

/// Use case for running every role's assessment concurrently
pub struct AssessmentCoordinator<P: AssessmentProvider + 'static> {
    provider: Arc<P>,
    role_timeout: Duration,
}

impl<P: AssessmentProvider + 'static> AssessmentCoordinator<P> {
    pub fn new(provider: Arc<P>, role_timeout: Duration) -> Self {
        Self {
            provider,
            role_timeout,
        }
    }

    /// Run without cancellation or progress
    pub async fn run(
        &self,
        case: &FinalCase,
        roles: &[RoleSpec],
        missing_fields: &[CaseField],
    ) -> Result<JoinedAssessment, CoordinatorError> {
        self.run_with_progress(
            case,
            roles,
            missing_fields,
            &CancellationToken::new(),
            &NoProgress,
        )
        .await
    }

    /// Run every role, stopping early only when `cancellation` fires.
    ///
    /// Each role's request is bounded by the per-role timeout; a role that
    /// fails, times out or panics is recorded with an empty payload and does
    /// not affect the others. On cancellation the outstanding requests are
    /// aborted and nothing is returned.
    pub async fn run_with_progress(
        &self,
        case: &FinalCase,
        roles: &[RoleSpec],
        missing_fields: &[CaseField],
        cancellation: &CancellationToken,
        progress: &dyn ProgressNotifier,
    ) -> Result<JoinedAssessment, CoordinatorError> {
        if roles.is_empty() {
            return Err(CoordinatorError::NoRoles);
        }

        info!("Starting assessment with {} roles", roles.len());
        progress.on_phase_start(&BoardPhase::Assessment, roles.len());

        let mut join_set = JoinSet::new();
        let mut spawned: HashMap<tokio::task::Id, Role> = HashMap::new();

        for spec in roles {
            let provider = Arc::clone(&self.provider);
            let request =
                AssessmentRequest::new(spec.role.clone(), case.clone(), missing_fields.to_vec());
            let timeout = self.role_timeout;

            let handle = join_set.spawn(async move {
                let started = Instant::now();
                let outcome = tokio::time::timeout(timeout, provider.assess(&request)).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let role = request.role;
                match outcome {
                    Ok(Ok(payload)) => AssessmentResult::ok(role, payload, elapsed_ms),
                    Ok(Err(ProviderError::Timeout)) | Err(_) => {
                        AssessmentResult::timed_out(role, elapsed_ms)
                    }
                    Ok(Err(e)) => AssessmentResult::failed(role, e.to_string(), elapsed_ms),
                }
            });
            spawned.insert(handle.id(), spec.role.clone());
        }

        let mut results = Vec::with_capacity(roles.len());

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    join_set.abort_all();
                    info!("Assessment cancelled; discarding outstanding results");
                    return Err(CoordinatorError::Cancelled);
                }
                joined = join_set.join_next_with_id() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => {
                    let Some(role) = spawned.get(&e.id()).cloned() else {
                        warn!("Task join error for an unknown role: {}", e);
                        continue;
                    };
                    warn!("Role {} task failed: {}", role, e);
                    AssessmentResult::failed(role, format!("task failed: {}", e), 0)
                }
            };

            match result.status {
                AssessmentStatus::Ok => info!(
                    "Role {} responded in {}ms",
                    result.role, result.elapsed_ms
                ),
                AssessmentStatus::TimedOut => {
                    warn!("Role {} timed out after {}ms", result.role, result.elapsed_ms)
                }
                AssessmentStatus::Failed => warn!(
                    "Role {} failed: {}",
                    result.role,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
            progress.on_role_complete(&result.role, result.status);
            results.push(result);
        }

        progress.on_phase_complete(&BoardPhase::Assessment);
        let joined = JoinedAssessment::assemble(roles, results);
        debug!(
            incomplete = joined.incomplete_roles().len(),
            "Assessment joined"
        );
        Ok(joined)
    }
}
