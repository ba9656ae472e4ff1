//! Intake states, modes and guided-phase transitions

use serde::{Deserialize, Serialize};

/// How the case is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntakeMode {
    #[default]
    Undetermined,
    Guided,
    Paste,
}

/// Position of an intake session in its state machine
///
/// Guided: `AwaitingMode → GuidedQ1 → GuidedQ2 (peri-operative only) →
/// GuidedQ3 → GuidedQ4 → GuidedQ5 → ReadyToFinalize`.
///
/// Paste: `AwaitingMode → AwaitingPaste → AwaitingConfirm → ReadyToFinalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntakeState {
    #[default]
    AwaitingMode,
    /// Primary question and peri-operative flag
    GuidedQ1,
    /// Procedure details (skipped when not peri-operative)
    GuidedQ2,
    /// Cardiac / kidney / metabolic essentials
    GuidedQ3,
    /// Current medications
    GuidedQ4,
    /// Additional concerns or the generate signal
    GuidedQ5,
    AwaitingPaste,
    AwaitingConfirm,
    /// Terminal: the case has been finalized
    ReadyToFinalize,
}

impl IntakeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeState::AwaitingMode => "awaiting_mode",
            IntakeState::GuidedQ1 => "guided_q1",
            IntakeState::GuidedQ2 => "guided_q2",
            IntakeState::GuidedQ3 => "guided_q3",
            IntakeState::GuidedQ4 => "guided_q4",
            IntakeState::GuidedQ5 => "guided_q5",
            IntakeState::AwaitingPaste => "awaiting_paste",
            IntakeState::AwaitingConfirm => "awaiting_confirm",
            IntakeState::ReadyToFinalize => "ready_to_finalize",
        }
    }

    pub fn is_guided(&self) -> bool {
        matches!(
            self,
            IntakeState::GuidedQ1
                | IntakeState::GuidedQ2
                | IntakeState::GuidedQ3
                | IntakeState::GuidedQ4
                | IntakeState::GuidedQ5
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == IntakeState::ReadyToFinalize
    }

    /// Next guided phase once the current batch is fully answered.
    ///
    /// `periop` is the case's peri-operative flag; `Some(false)` takes the
    /// conditional edge that skips the procedure phase. `GuidedQ5` has no
    /// automatic successor: only an explicit generate signal leaves it.
    pub fn next_guided(&self, periop: Option<bool>) -> IntakeState {
        match self {
            IntakeState::GuidedQ1 if periop == Some(true) => IntakeState::GuidedQ2,
            IntakeState::GuidedQ1 => IntakeState::GuidedQ3,
            IntakeState::GuidedQ2 => IntakeState::GuidedQ3,
            IntakeState::GuidedQ3 => IntakeState::GuidedQ4,
            IntakeState::GuidedQ4 => IntakeState::GuidedQ5,
            other => *other,
        }
    }
}

impl std::fmt::Display for IntakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
