//! Consultation Snapshot: the canonical, length-bounded report

use crate::assessment::role::Role;
use crate::core::string::word_count;
use serde::{Deserialize, Serialize};

pub const MAX_FACTS: usize = 5;
pub const MAX_RISKS: usize = 5;

/// Default rendered word limit
pub const DEFAULT_WORD_LIMIT: usize = 250;

/// Required sections A–E
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotSection {
    Problem,
    Facts,
    Risks,
    Decision,
    NextSteps,
}

impl SnapshotSection {
    pub const ALL: [SnapshotSection; 5] = [
        SnapshotSection::Problem,
        SnapshotSection::Facts,
        SnapshotSection::Risks,
        SnapshotSection::Decision,
        SnapshotSection::NextSteps,
    ];

    pub fn letter(&self) -> char {
        match self {
            SnapshotSection::Problem => 'A',
            SnapshotSection::Facts => 'B',
            SnapshotSection::Risks => 'C',
            SnapshotSection::Decision => 'D',
            SnapshotSection::NextSteps => 'E',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        SnapshotSection::ALL
            .into_iter()
            .find(|s| s.letter() == c.to_ascii_uppercase())
    }

    pub fn title(&self) -> &'static str {
        match self {
            SnapshotSection::Problem => "One-Line Problem",
            SnapshotSection::Facts => "Key Facts",
            SnapshotSection::Risks => "Key Risks",
            SnapshotSection::Decision => "Decisions Needed Today",
            SnapshotSection::NextSteps => "Next Steps",
        }
    }
}

/// A fact or risk line, optionally annotated with the roles that agree on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agreed_by: Vec<Role>,
}

impl SnapshotItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            agreed_by: Vec::new(),
        }
    }

    pub fn is_agreed(&self) -> bool {
        self.agreed_by.len() > 1
    }
}

/// `**Action** — Owner (Timing)` triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub action: String,
    pub owner: String,
    pub timing: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agreed_by: Vec<Role>,
}

impl NextStep {
    pub fn new(
        action: impl Into<String>,
        owner: impl Into<String>,
        timing: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            owner: owner.into(),
            timing: timing.into(),
            agreed_by: Vec::new(),
        }
    }

    pub fn is_agreed(&self) -> bool {
        self.agreed_by.len() > 1
    }
}

/// Whether a decision is needed today, with a brief rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub needed: bool,
    pub rationale: String,
}

/// The synthesized Consultation Snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub problem: String,
    pub facts: Vec<SnapshotItem>,
    pub risks: Vec<SnapshotItem>,
    pub decision: Decision,
    pub next_steps: Vec<NextStep>,
    /// Set when the snapshot could not be made fully valid within the retry bound
    #[serde(default)]
    pub truncated: bool,
}

fn agreement_suffix(roles: &[Role]) -> String {
    if roles.len() < 2 {
        return String::new();
    }
    let names: Vec<String> = roles.iter().map(Role::display_name).collect();
    format!(" (agreed: {})", names.join(", "))
}

impl Snapshot {
    /// Canonical plain rendering; the word limit is measured on this text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "A) {}: {}\n",
            SnapshotSection::Problem.title(),
            self.problem
        ));

        out.push_str(&format!("B) {}:\n", SnapshotSection::Facts.title()));
        for (i, fact) in self.facts.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}{}\n",
                i + 1,
                fact.text,
                agreement_suffix(&fact.agreed_by)
            ));
        }

        out.push_str(&format!("C) {}:\n", SnapshotSection::Risks.title()));
        for (i, risk) in self.risks.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}{}\n",
                i + 1,
                risk.text,
                agreement_suffix(&risk.agreed_by)
            ));
        }

        let answer = if self.decision.needed { "Yes" } else { "No" };
        if self.decision.rationale.is_empty() {
            out.push_str(&format!(
                "D) {}: {}\n",
                SnapshotSection::Decision.title(),
                answer
            ));
        } else {
            out.push_str(&format!(
                "D) {}: {} — {}\n",
                SnapshotSection::Decision.title(),
                answer,
                self.decision.rationale
            ));
        }

        out.push_str(&format!("E) {}:\n", SnapshotSection::NextSteps.title()));
        for step in &self.next_steps {
            out.push_str(&format!(
                "- {} — {} ({}){}\n",
                step.action,
                step.owner,
                step.timing,
                agreement_suffix(&step.agreed_by)
            ));
        }
        out
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.render())
    }

    /// Whether any fact line equals `sentence` exactly
    pub fn has_fact(&self, sentence: &str) -> bool {
        self.facts.iter().any(|f| f.text == sentence)
    }
}
