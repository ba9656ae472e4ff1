//! Consultation session use case
//!
//! Wires intake, fan-out, synthesis and the output gate for one
//! conversation. One call to [`ConsultationSession::handle_turn`] is one user
//! turn.

use super::intake::IntakeSession;
use super::output_gate::{GateError, OutputGate};
use super::run_assessment::{AssessmentCoordinator, CoordinatorError};
use super::synthesize::{AttemptObserver, SynthesisStage};
use crate::config::BoardConfig;
use crate::ports::assessment_provider::AssessmentProvider;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::intake_parser::IntakeParser;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::synthesis_provider::SynthesisProvider;
use ckm_domain::{
    ExpansionState, FinalCase, IntakePrompt, RenderedView, ValidationIssue, ViewRequest,
};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Internal faults; user-level problems come back as [`TurnOutput::Error`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsultationError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// What one turn produced
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutput {
    /// Next intake prompt
    Prompt(IntakePrompt),
    /// Snapshot or a detail view
    View(RenderedView),
    /// Input rejected; state unchanged
    Error { message: String, prompt: IntakePrompt },
    /// The submission was superseded by a reset
    Cancelled,
}

#[derive(Debug)]
struct ResetInner {
    generation: AtomicU64,
    token: Mutex<CancellationToken>,
}

/// Cloneable trigger for resetting a session from another task
///
/// A reset cancels the in-flight submission's token and bumps the
/// generation; the session drops any result from an older generation.
#[derive(Debug, Clone)]
pub struct ResetHandle {
    inner: Arc<ResetInner>,
}

impl Default for ResetHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ResetInner {
                generation: AtomicU64::new(0),
                token: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn reset(&self) {
        let mut token = self
            .inner
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        token.cancel();
        *token = CancellationToken::new();
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Token cancelled by the next reset
    pub fn token(&self) -> CancellationToken {
        self.inner
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Records synthesis attempts on the conversation log
struct AttemptLog<'a>(&'a dyn ConversationLogger);

impl AttemptObserver for AttemptLog<'_> {
    fn on_attempt(&self, attempt: u32, issues: &[ValidationIssue]) {
        self.0.log(ConversationEvent::new(
            "synthesis_attempt",
            json!({
                "attempt": attempt,
                "valid": issues.is_empty(),
                "issues": issues.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
            }),
        ));
    }
}

/// One conversation with the consultation board
pub struct ConsultationSession<A: AssessmentProvider + 'static, S: SynthesisProvider + 'static> {
    intake: IntakeSession,
    gate: OutputGate,
    coordinator: AssessmentCoordinator<A>,
    synthesis: SynthesisStage<S>,
    parser: Arc<dyn IntakeParser>,
    config: BoardConfig,
    logger: Arc<dyn ConversationLogger>,
    progress: Arc<dyn ProgressNotifier>,
    reset: ResetHandle,
    /// Generation whose reset has already been applied
    generation: u64,
}

impl<A: AssessmentProvider + 'static, S: SynthesisProvider + 'static> ConsultationSession<A, S> {
    pub fn new(
        assessment: Arc<A>,
        synthesis: Arc<S>,
        parser: Arc<dyn IntakeParser>,
        config: BoardConfig,
    ) -> Self {
        Self {
            intake: IntakeSession::new(),
            gate: OutputGate::new(),
            coordinator: AssessmentCoordinator::new(assessment, config.role_timeout),
            synthesis: SynthesisStage::new(synthesis),
            parser,
            config,
            logger: Arc::new(NoConversationLogger),
            progress: Arc::new(NoProgress),
            reset: ResetHandle::new(),
            generation: 0,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }

    pub fn intake(&self) -> &IntakeSession {
        &self.intake
    }

    pub fn gate(&self) -> &OutputGate {
        &self.gate
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Prompt that opens the conversation
    pub fn greeting(&self) -> IntakePrompt {
        self.intake.current_prompt()
    }

    /// Reset now and return the opening prompt
    pub fn reset(&mut self) -> IntakePrompt {
        self.reset.reset();
        self.sync_reset();
        self.greeting()
    }

    /// Process one user turn
    pub async fn handle_turn(&mut self, input: &str) -> Result<TurnOutput, ConsultationError> {
        self.sync_reset();

        if self.intake.is_terminated() {
            if let Some(request) = ViewRequest::parse(input)
                && self.gate.has_snapshot()
            {
                let rendered = self.gate.view(request)?;
                self.logger.log(ConversationEvent::new(
                    "view",
                    json!({ "request": format!("{:?}", request), "view": request.target().as_str() }),
                ));
                return Ok(TurnOutput::View(rendered));
            }
            info!("Input outside the gate; starting the next case");
            self.intake = IntakeSession::new();
        }

        let state = self.intake.state();
        match self.intake.submit(input, self.parser.as_ref()).await {
            Ok(turn) => {
                self.logger.log(ConversationEvent::new(
                    "intake_turn",
                    json!({
                        "state": state.as_str(),
                        "next_state": self.intake.state().as_str(),
                        "fields": turn.case_delta.iter().map(|(f, _)| f.as_str()).collect::<Vec<_>>(),
                        "finalized": turn.finalized,
                    }),
                ));
                if !turn.finalized {
                    return Ok(TurnOutput::Prompt(turn.next_prompt));
                }
                match self.intake.take_final() {
                    Some(case) => self.submit_case(case).await,
                    None => Ok(TurnOutput::Prompt(turn.next_prompt)),
                }
            }
            Err(e) => {
                self.logger.log(ConversationEvent::new(
                    "intake_turn",
                    json!({ "state": state.as_str(), "error": e.to_string() }),
                ));
                Ok(TurnOutput::Error {
                    message: e.to_string(),
                    prompt: self.intake.current_prompt(),
                })
            }
        }
    }

    /// Fan out, synthesize and install the result for a finalized case
    async fn submit_case(&mut self, case: FinalCase) -> Result<TurnOutput, ConsultationError> {
        let generation = self.reset.generation();
        let token = self.reset.token();
        let missing = self.config.missing_critical(&case);

        let joined = match self
            .coordinator
            .run_with_progress(
                &case,
                &self.config.roles,
                &missing,
                &token,
                self.progress.as_ref(),
            )
            .await
        {
            Ok(joined) => joined,
            Err(CoordinatorError::Cancelled) => return Ok(self.cancelled()),
            Err(e) => return Err(e.into()),
        };

        for result in joined.results() {
            self.logger.log(ConversationEvent::new(
                "assessment_result",
                json!({
                    "role": result.role.as_str(),
                    "status": result.status.as_str(),
                    "elapsed_ms": result.elapsed_ms,
                    "error": result.error,
                }),
            ));
        }
        if self.reset.generation() != generation {
            return Ok(self.cancelled());
        }

        let observer = AttemptLog(self.logger.as_ref());
        let output = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            output = self.synthesis.synthesize_with_progress(
                &case,
                &joined,
                &self.config,
                self.progress.as_ref(),
                &observer,
            ) => Some(output),
        };
        let Some(output) = output else {
            return Ok(self.cancelled());
        };
        if self.reset.generation() != generation {
            return Ok(self.cancelled());
        }

        self.logger.log(ConversationEvent::new(
            "snapshot_ready",
            json!({
                "attempts": output.attempts,
                "truncated": output.snapshot.truncated,
                "words": output.snapshot.word_count(),
                "overrides": output.fired_overrides.len(),
                "resolutions": output.resolutions.len(),
            }),
        ));
        info!(
            "Snapshot ready after {} attempt(s){}",
            output.attempts,
            if output.snapshot.truncated { " (truncated)" } else { "" }
        );

        self.gate.install(ExpansionState::new(
            case,
            joined,
            output,
            self.config.roles.clone(),
        ));
        let rendered = self.gate.view(ViewRequest::Snapshot)?;
        Ok(TurnOutput::View(rendered))
    }

    fn cancelled(&mut self) -> TurnOutput {
        warn!("Submission superseded by a reset; discarding results");
        self.sync_reset();
        TurnOutput::Cancelled
    }

    /// Apply any reset triggered since the last turn
    fn sync_reset(&mut self) {
        let current = self.reset.generation();
        if current == self.generation {
            return;
        }
        self.generation = current;
        self.intake = IntakeSession::new();
        self.gate.clear();
        info!("Session reset");
        self.logger.log(ConversationEvent::new(
            "session_reset",
            json!({ "generation": current }),
        ));
    }
}
