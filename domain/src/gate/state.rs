//! Cached consultation state behind the output gate

use super::projection::{self, RenderedView};
use super::view::View;
use crate::assessment::role::RoleSpec;
use crate::assessment::value_objects::JoinedAssessment;
use crate::case::entities::FinalCase;
use crate::synthesis::request::SynthesisOutput;
use crate::synthesis::snapshot::Snapshot;

/// Everything the detail views project from, held by value.
///
/// Built once per finalized case and replaced whole when the next case
/// reaches `Final`.
#[derive(Debug, Clone)]
pub struct ExpansionState {
    case: FinalCase,
    joined: JoinedAssessment,
    output: SynthesisOutput,
    roles: Vec<RoleSpec>,
    current_view: View,
}

impl ExpansionState {
    pub fn new(
        case: FinalCase,
        joined: JoinedAssessment,
        output: SynthesisOutput,
        roles: Vec<RoleSpec>,
    ) -> Self {
        Self {
            case,
            joined,
            output,
            roles,
            current_view: View::Snapshot,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.output.snapshot
    }

    pub fn case(&self) -> &FinalCase {
        &self.case
    }

    pub fn joined(&self) -> &JoinedAssessment {
        &self.joined
    }

    pub fn output(&self) -> &SynthesisOutput {
        &self.output
    }

    pub fn current_view(&self) -> View {
        self.current_view
    }

    /// Switch to `view` and render it
    pub fn show(&mut self, view: View) -> RenderedView {
        self.current_view = view;
        self.render(view)
    }

    pub fn render(&self, view: View) -> RenderedView {
        match view {
            View::Snapshot => RenderedView::Snapshot(self.output.snapshot.clone()),
            View::Table => {
                RenderedView::Table(projection::medication_table(&self.case, &self.output))
            }
            View::Rationale => {
                RenderedView::Rationale(projection::rationale(&self.joined, &self.output))
            }
            View::Citations => {
                RenderedView::Citations(projection::citations(&self.joined, &self.roles))
            }
        }
    }
}
