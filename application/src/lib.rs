//! Application layer for ckm-board
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BoardConfig, DEFAULT_ROLE_TIMEOUT};
pub use ports::{
    assessment_provider::{AssessmentProvider, ProviderError},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    intake_parser::IntakeParser,
    progress::{BoardPhase, NoProgress, ProgressNotifier},
    synthesis_provider::SynthesisProvider,
};
pub use use_cases::consultation::{
    ConsultationError, ConsultationSession, ResetHandle, TurnOutput,
};
pub use use_cases::intake::{IntakeError, IntakeSession, IntakeTurn};
pub use use_cases::output_gate::{GateError, OutputGate};
pub use use_cases::run_assessment::{AssessmentCoordinator, CoordinatorError};
pub use use_cases::synthesize::{AttemptObserver, NoAttemptObserver, SynthesisStage};
