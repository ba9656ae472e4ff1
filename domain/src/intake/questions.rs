//! Guided question batches and the prompt emitted each intake turn

use super::state::IntakeState;
use crate::case::entities::{Case, CaseDiff};
use crate::case::field::CaseField;
use serde::{Deserialize, Serialize};

/// Hard cap on questions asked in one turn
pub const MAX_QUESTIONS_PER_TURN: usize = 5;

/// One guided question and the case field its answer fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeQuestion {
    pub field: CaseField,
    pub text: &'static str,
}

const Q1: &[IntakeQuestion] = &[
    IntakeQuestion {
        field: CaseField::PrimaryQuestion,
        text: "What is the primary clinical question today? (e.g. medication optimization, peri-operative clearance, new diagnosis workup, decompensation management)",
    },
    IntakeQuestion {
        field: CaseField::Periop,
        text: "Is this a peri-operative consultation? Reply Yes/No.",
    },
];

const Q2: &[IntakeQuestion] = &[IntakeQuestion {
    field: CaseField::Procedure,
    text: "Procedure details: type of surgery, urgency (elective/urgent/emergent), expected duration and bleeding risk, planned contrast use.",
}];

const Q3: &[IntakeQuestion] = &[
    IntakeQuestion {
        field: CaseField::Cardiac,
        text: "Cardiac: ejection fraction (EF%), recent echo, NYHA class, BNP/NT-proBNP.",
    },
    IntakeQuestion {
        field: CaseField::Kidney,
        text: "Kidney: eGFR or creatinine, CKD stage, proteinuria (UACR if known).",
    },
    IntakeQuestion {
        field: CaseField::Metabolic,
        text: "Metabolic: HbA1c, diabetes type, BMI if available.",
    },
];

const Q4: &[IntakeQuestion] = &[IntakeQuestion {
    field: CaseField::Medications,
    text: "Current medications, especially SGLT2 inhibitors, GLP-1 RAs, metformin, ACEi/ARB/ARNI, beta-blockers, MRAs, diuretics, anticoagulants/antiplatelets, statins. Reply 'none' if none.",
}];

const Q5: &[IntakeQuestion] = &[IntakeQuestion {
    field: CaseField::Concerns,
    text: "Any additional concerns for the specialist panel? Or reply 'Generate synthesis' to proceed.",
}];

/// Question batch for a guided state (empty for non-guided states)
pub fn batch_for(state: IntakeState) -> &'static [IntakeQuestion] {
    match state {
        IntakeState::GuidedQ1 => Q1,
        IntakeState::GuidedQ2 => Q2,
        IntakeState::GuidedQ3 => Q3,
        IntakeState::GuidedQ4 => Q4,
        IntakeState::GuidedQ5 => Q5,
        _ => &[],
    }
}

/// Questions of the batch whose field is still unset on `case`.
///
/// `GuidedQ5` is always asked in full: concerns are optional and the turn
/// also offers the generate signal.
pub fn pending_questions(state: IntakeState, case: &Case) -> Vec<IntakeQuestion> {
    let batch = batch_for(state);
    if state == IntakeState::GuidedQ5 {
        return batch.to_vec();
    }
    batch
        .iter()
        .copied()
        .filter(|q| !case.is_set(q.field))
        .collect()
}

/// Welcome text shown when the mode is not yet chosen
pub const WELCOME: &str = "Welcome to the Cardio-Kidney-Metabolic (CKM) Multi-Specialist Consultation.\n\
Choose your intake mode:\n  1. Guided intake (recommended): a few high-yield questions step by step\n  \
2. Paste mode: paste the full case (free text or JSON) and it will be structured\n\
Reply 1 or 2 to begin.";

pub const PASTE_REQUEST: &str =
    "Please paste your case (free text or JSON). It will be structured for the specialist panel.";

pub const CONFIRM_REQUEST: &str =
    "Is this correct? Reply 'Confirm' to proceed, 'Reject' to paste again, or type corrections.";

/// What intake shows the user at the end of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakePrompt {
    /// Free text shown above the questions
    pub message: Option<String>,
    /// Questions asked this turn; never more than [`MAX_QUESTIONS_PER_TURN`]
    questions: Vec<String>,
}

impl IntakePrompt {
    /// Build a prompt; questions beyond the per-turn cap are dropped
    pub fn new(message: Option<String>, questions: impl IntoIterator<Item = String>) -> Self {
        Self {
            message,
            questions: questions
                .into_iter()
                .take(MAX_QUESTIONS_PER_TURN)
                .collect(),
        }
    }

    /// Prompt with only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(Some(message.into()), Vec::new())
    }

    /// Prompt for the unanswered questions of a guided state
    pub fn for_state(state: IntakeState, case: &Case, message: Option<String>) -> Self {
        Self::new(
            message,
            pending_questions(state, case)
                .into_iter()
                .map(|q| q.text.to_string()),
        )
    }

    /// Confirmation prompt showing what the parser extracted
    pub fn confirm(diff: &CaseDiff) -> Self {
        let mut lines = vec!["Extracted case:".to_string()];
        for (field, value) in diff.iter() {
            lines.push(format!("  {}: {}", field.label(), value.display_for(*field)));
        }
        lines.push(CONFIRM_REQUEST.to_string());
        Self::message(lines.join("\n"))
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl std::fmt::Display for IntakePrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(message) = &self.message {
            writeln!(f, "{}", message)?;
        }
        for (i, q) in self.questions.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, q)?;
        }
        Ok(())
    }
}
