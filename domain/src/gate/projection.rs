//! Detail views projected from held consultation data.
//!
//! Every function here is a pure function of its inputs: no provider is
//! consulted and repeated calls return identical views.

use crate::assessment::role::{Role, RoleSpec};
use crate::assessment::value_objects::{AssessmentStatus, JoinedAssessment};
use crate::case::entities::Case;
use crate::core::string::{contains_word, strip_list_marker};
use crate::medication::MedicationClass;
use crate::synthesis::request::SynthesisOutput;
use crate::synthesis::snapshot::Snapshot;
use serde::Serialize;

/// Bullets kept per role in the rationale view
pub const MAX_RATIONALE_BULLETS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationRow {
    /// Medication as the case lists it
    pub medication: String,
    pub class: MedicationClass,
    pub continue_: String,
    pub hold: String,
    pub restart: String,
    pub owner: String,
    pub notes: Vec<String>,
}

/// A) Peri-operative medication stoplight table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationTable {
    pub rows: Vec<MedicationRow>,
    /// Listed medications outside the managed catalogue
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRationale {
    pub role: Role,
    pub status: AssessmentStatus,
    pub bullets: Vec<String>,
    pub error: Option<String>,
}

/// B) Specialist rationale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RationaleView {
    pub roles: Vec<RoleRationale>,
    pub agreements: Vec<String>,
    pub resolutions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCitations {
    pub role: Role,
    /// Configured guideline references
    pub references: Vec<String>,
    /// Payload lines that cite a guideline
    pub cited: Vec<String>,
}

/// C) Guideline citations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationView {
    pub roles: Vec<RoleCitations>,
}

/// Output of one gate request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum RenderedView {
    Snapshot(Snapshot),
    Table(MedicationTable),
    Rationale(RationaleView),
    Citations(CitationView),
}

pub fn medication_table(case: &Case, output: &SynthesisOutput) -> MedicationTable {
    let mut rows = Vec::new();
    let mut unmatched = Vec::new();

    for medication in case.medications().unwrap_or_default() {
        let Some(class) = MedicationClass::classify(medication) else {
            unmatched.push(medication.clone());
            continue;
        };
        let guidance = class.guidance();
        let mut notes: Vec<String> = output
            .fired_overrides
            .iter()
            .filter(|ov| ov.item == class)
            .map(|ov| format!("Safety override: {}", ov.directive()))
            .collect();
        notes.extend(
            output
                .resolutions
                .iter()
                .filter(|r| r.item == class)
                .map(|r| format!("Resolved: {}", r.summary())),
        );
        rows.push(MedicationRow {
            medication: medication.clone(),
            class,
            continue_: guidance.continue_.to_string(),
            hold: guidance.hold.to_string(),
            restart: guidance.restart.to_string(),
            owner: guidance.owner.to_string(),
            notes,
        });
    }

    MedicationTable { rows, unmatched }
}

fn clean_line(line: &str) -> String {
    strip_list_marker(line).replace('*', "").trim().to_string()
}

fn is_heading(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('#') || t.ends_with(':')
}

/// First bullets of a payload, falling back to its first plain lines
fn key_points(payload: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = payload
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_heading(l))
        .collect();
    let bullets: Vec<String> = lines
        .iter()
        .filter(|l| strip_list_marker(l).len() != l.len())
        .map(|l| clean_line(l))
        .take(max)
        .collect();
    if !bullets.is_empty() {
        return bullets;
    }
    lines.iter().map(|l| clean_line(l)).take(max).collect()
}

pub fn rationale(joined: &JoinedAssessment, output: &SynthesisOutput) -> RationaleView {
    let roles = joined
        .results()
        .iter()
        .map(|result| RoleRationale {
            role: result.role.clone(),
            status: result.status,
            bullets: key_points(&result.payload, MAX_RATIONALE_BULLETS),
            error: result.error.clone(),
        })
        .collect();

    let agreements = output
        .agreements
        .iter()
        .map(|a| {
            let names: Vec<String> = a.roles.iter().map(Role::display_name).collect();
            format!("{} ({})", a.text, names.join(", "))
        })
        .collect();

    RationaleView {
        roles,
        agreements,
        resolutions: output.resolutions.iter().map(|r| r.summary()).collect(),
    }
}

const CITATION_MARKERS: [&str; 12] = [
    "guideline",
    "guidelines",
    "kdigo",
    "esc",
    "ada",
    "aha",
    "acc",
    "hfsa",
    "asa",
    "standards of care",
    "et al",
    "doi",
];

fn cites_guideline(line: &str) -> bool {
    let lower = line.to_lowercase();
    CITATION_MARKERS.iter().any(|m| contains_word(&lower, m))
}

pub fn citations(joined: &JoinedAssessment, roles: &[RoleSpec]) -> CitationView {
    let roles = joined
        .results()
        .iter()
        .map(|result| {
            let references = roles
                .iter()
                .find(|spec| spec.role == result.role)
                .map(|spec| spec.citations.clone())
                .unwrap_or_default();
            let mut cited: Vec<String> = Vec::new();
            for line in result.payload.lines().filter(|l| cites_guideline(l)) {
                let line = clean_line(line);
                if !line.is_empty() && !cited.contains(&line) {
                    cited.push(line);
                }
            }
            RoleCitations {
                role: result.role.clone(),
                references,
                cited,
            }
        })
        .collect();
    CitationView { roles }
}
