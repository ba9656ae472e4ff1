//! Prompt templates for the consultation flow

use crate::assessment::role::Role;
use crate::assessment::value_objects::{AssessmentRequest, AssessmentStatus};
use crate::case::field::CaseField;
use crate::synthesis::request::SynthesisRequest;
use crate::synthesis::snapshot::SnapshotSection;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for one specialist role
    pub fn role_system(role: &Role) -> String {
        let focus = match role {
            Role::Cardiology => {
                "heart failure phenotype, ischemic and arrhythmic risk, volume status, \
                 peri-operative cardiac risk and cardiac medications"
            }
            Role::Nephrology => {
                "CKD stage and trajectory, AKI risk, electrolytes, contrast exposure \
                 and renally cleared or nephrotoxic medications"
            }
            Role::Endocrinology => {
                "glycemic control, hypoglycemia and ketoacidosis risk, and diabetes \
                 medications around procedures"
            }
            Role::Custom(_) => "the aspects of the case within your specialty",
        };
        format!(
            r#"You are a consulting {} specialist on a Cardio-Kidney-Metabolic board.
Assess the case from your specialty only, focusing on {}.
Write short bullet points. State each medication recommendation as one bullet
that starts with an action verb (continue, hold, stop, start, adjust).
Name the guideline behind each recommendation where one applies.
Do not invent values that are not in the case."#,
            role.display_name(),
            focus
        )
    }

    /// User prompt for one role's assessment
    pub fn assessment_prompt(request: &AssessmentRequest) -> String {
        let mut prompt = format!("Case:\n{}\n", request.case.summary());
        if !request.missing_fields.is_empty() {
            let names: Vec<&str> = request.missing_fields.iter().map(CaseField::label).collect();
            prompt.push_str(&format!(
                "\nNot provided: {}. Say what is uncertain without these values; do not estimate them.\n",
                names.join(", ")
            ));
        }
        prompt.push_str(
            "\nGive your assessment, key risks and recommendations as bullet points.",
        );
        prompt
    }

    /// System prompt for synthesis
    pub fn synthesis_system() -> &'static str {
        r#"You are the moderator of a Cardio-Kidney-Metabolic consultation board.
Merge the specialist assessments into one Consultation Snapshot.
Use exactly these sections in this order:
A) One-Line Problem:
B) Key Facts: (at most 5 numbered items)
C) Key Risks: (at most 5 numbered items)
D) Decisions Needed Today: Yes or No, then a short rationale
E) Next Steps: one bullet per step as **Action** — Owner (Timing)
State each recommendation once even when several specialists made it."#
    }

    /// User prompt for synthesis, embedding the directives
    pub fn synthesis_prompt(request: &SynthesisRequest) -> String {
        let d = &request.directives;
        let mut prompt = format!("Case:\n{}\n\nSpecialist assessments:\n", request.case.summary());

        for result in request.joined.results() {
            match result.status {
                AssessmentStatus::Ok => prompt.push_str(&format!(
                    "\n--- {} ---\n{}\n",
                    result.role.display_name(),
                    result.payload
                )),
                status => prompt.push_str(&format!(
                    "\n--- {} ---\n(no assessment: {})\n",
                    result.role.display_name(),
                    status.as_str()
                )),
            }
        }

        prompt.push_str(&format!("\nRules:\n- Keep the whole Snapshot under {} words.\n", d.word_limit));
        if d.deduplicate {
            prompt.push_str("- Merge duplicate recommendations into a single item.\n");
        }
        for agreement in &d.agreements {
            let names: Vec<String> = agreement.roles.iter().map(Role::display_name).collect();
            prompt.push_str(&format!(
                "- Agreed by {}: {}\n",
                names.join(", "),
                agreement.text
            ));
        }
        for flag in &d.missing_flags {
            prompt.push_str(&format!("- Key Facts must include exactly: \"{}\"\n", flag));
        }
        if !d.conflict_priority.is_empty() {
            let order: Vec<&str> = d.conflict_priority.iter().map(|p| p.label()).collect();
            prompt.push_str(&format!(
                "- Resolve disagreements in this priority order: {}\n",
                order.join(" > ")
            ));
        }
        for resolution in &d.resolutions {
            prompt.push_str(&format!("- Resolved: {}\n", resolution.summary()));
        }
        for ov in &d.safety_overrides {
            prompt.push_str(&format!("- Mandatory: {}\n", ov.directive()));
        }
        if d.decision_required {
            prompt.push_str("- D) Decisions Needed Today must be Yes.\n");
        }

        if !d.feedback.is_empty() {
            prompt.push_str(&format!(
                "\nAttempt {} must fix these problems with the previous one:\n",
                request.attempt
            ));
            for issue in &d.feedback {
                prompt.push_str(&format!("- {}\n", issue));
            }
        }

        let letters: Vec<String> = SnapshotSection::ALL
            .iter()
            .map(|s| format!("{})", s.letter()))
            .collect();
        prompt.push_str(&format!(
            "\nRespond with sections {} only.",
            letters.join(" ")
        ));
        prompt
    }

    /// System prompt for turning pasted notes into case fields
    pub fn intake_parse_system() -> &'static str {
        r#"You extract structured fields from clinical notes.
Reply with a single JSON object and nothing else.
Only include fields that the notes state explicitly."#
    }

    /// User prompt for paste parsing
    pub fn intake_parse_prompt(text: &str) -> String {
        let fields: Vec<String> = CaseField::ALL
            .iter()
            .map(|f| {
                let kind = match f.kind() {
                    crate::case::field::FieldKind::Text => "string",
                    crate::case::field::FieldKind::Flag => "boolean",
                    crate::case::field::FieldKind::Measure => "number",
                    crate::case::field::FieldKind::List => "array of strings",
                };
                format!("- {} ({})", f.as_str(), kind)
            })
            .collect();
        format!(
            "Allowed keys:\n{}\n\nNotes:\n{}\n",
            fields.join("\n"),
            text
        )
    }
}
