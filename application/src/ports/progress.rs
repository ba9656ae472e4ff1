//! Progress notification port
//!
//! Defines the interface for reporting progress while a finalized case moves
//! through assessment and synthesis.

use ckm_domain::{AssessmentStatus, Role};

/// Long-running phases of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPhase {
    /// Concurrent specialist assessments ("compiling case")
    Assessment,
    Synthesis,
}

impl BoardPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardPhase::Assessment => "assessment",
            BoardPhase::Synthesis => "synthesis",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BoardPhase::Assessment => "Compiling case",
            BoardPhase::Synthesis => "Synthesizing snapshot",
        }
    }
}

/// Callback for progress updates
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console spinner, log lines, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: &BoardPhase, total_tasks: usize);

    /// Called when one role's assessment settles
    fn on_role_complete(&self, role: &Role, status: AssessmentStatus);

    /// Called before each synthesis provider call (1-based)
    fn on_synthesis_attempt(&self, _attempt: u32) {}

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: &BoardPhase);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: &BoardPhase, _total_tasks: usize) {}
    fn on_role_complete(&self, _role: &Role, _status: AssessmentStatus) {}
    fn on_phase_complete(&self, _phase: &BoardPhase) {}
}
