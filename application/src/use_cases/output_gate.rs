//! Output gate use case
//!
//! Serves the Snapshot and its detail views from the cached expansion state.
//! Views are projections of held data; the gate has no provider handle and
//! cannot regenerate anything.

use ckm_domain::{ExpansionState, RenderedView, View, ViewRequest};
use thiserror::Error;
use tracing::debug;

/// Internal faults of the gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Internal error: view requested with no cached snapshot")]
    NoSnapshot,
}

/// Holder of the current consultation's expansion state
#[derive(Debug, Default)]
pub struct OutputGate {
    state: Option<ExpansionState>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached state whole; returns the superseded one
    pub fn install(&mut self, state: ExpansionState) -> Option<ExpansionState> {
        debug!("Installing expansion state");
        self.state.replace(state)
    }

    pub fn clear(&mut self) {
        self.state = None;
    }

    pub fn has_snapshot(&self) -> bool {
        self.state.is_some()
    }

    pub fn current_view(&self) -> Option<View> {
        self.state.as_ref().map(ExpansionState::current_view)
    }

    pub fn state(&self) -> Option<&ExpansionState> {
        self.state.as_ref()
    }

    /// Handle one view request
    pub fn view(&mut self, request: ViewRequest) -> Result<RenderedView, GateError> {
        let state = self.state.as_mut().ok_or(GateError::NoSnapshot)?;
        let target = request.target();
        debug!(from = %state.current_view(), to = %target, "Gate view");
        Ok(state.show(target))
    }
}
