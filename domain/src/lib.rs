//! Domain layer for ckm-board
//!
//! This crate contains the core consultation logic, entities, and value
//! objects. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Case and intake
//!
//! A [`Case`] is assembled turn by turn while in `Draft`, then frozen into a
//! [`FinalCase`]. Only a `FinalCase` can be sent to the specialist roles.
//!
//! ## Board
//!
//! - **Fan-out**: every registered [`Role`] assesses the same case concurrently
//! - **Join**: results are ordered by role priority, not by arrival
//! - **Synthesis**: payloads are merged into a length-bounded [`Snapshot`]
//!
//! ## Expansion
//!
//! The Snapshot is the home view. Tables, rationale and citations are pure
//! projections of the held [`ExpansionState`].

pub mod assessment;
pub mod case;
pub mod config;
pub mod core;
pub mod gate;
pub mod intake;
pub mod medication;
pub mod prompt;
pub mod synthesis;

// Re-export commonly used types
pub use assessment::{
    role::{Role, RoleSpec},
    value_objects::{AssessmentRequest, AssessmentResult, AssessmentStatus, JoinedAssessment},
};
pub use case::{
    entities::{Case, CaseDiff, CaseStatus, FinalCase},
    field::{CaseField, FieldKind, FieldValue},
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::error::DomainError;
pub use gate::{
    projection::{
        CitationView, MedicationRow, MedicationTable, RationaleView, RenderedView, RoleCitations,
        RoleRationale,
    },
    state::ExpansionState,
    view::{View, ViewRequest},
};
pub use intake::{
    questions::{IntakePrompt, IntakeQuestion, MAX_QUESTIONS_PER_TURN},
    signal::IntakeSignal,
    state::{IntakeMode, IntakeState},
};
pub use medication::{MedAction, MedicationClass};
pub use prompt::PromptTemplate;
pub use synthesis::{
    agreement::Agreement,
    conflict::{ConflictPriority, MedicationConflict, Resolution, ResolutionBasis},
    critical::CriticalFieldRule,
    overrides::{OverrideCondition, SafetyOverride},
    request::{SynthesisDirectives, SynthesisOutput, SynthesisRequest},
    snapshot::{Decision, NextStep, Snapshot, SnapshotItem, SnapshotSection},
    validation::ValidationIssue,
};
