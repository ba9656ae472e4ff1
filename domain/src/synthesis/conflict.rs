//! Conflict detection and priority-based resolution for managed medications.
//!
//! Two roles conflict when their payloads assert different actions for the
//! same [`MedicationClass`]. The resolution follows the fixed priority order
//! (patient safety, guideline evidence, drug interaction, progression risk);
//! a fired safety override wins outright.

use super::overrides::SafetyOverride;
use super::snapshot::{NextStep, Snapshot};
use crate::assessment::role::{Role, RoleSpec};
use crate::assessment::value_objects::JoinedAssessment;
use crate::core::string::{contains_word, strip_list_marker};
use crate::medication::{MedAction, MedicationClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conflict-resolution rank; lower wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPriority {
    PatientSafety = 1,
    GuidelineEvidence = 2,
    DrugInteraction = 3,
    ProgressionRisk = 4,
    Unranked = 5,
}

impl ConflictPriority {
    /// Ranked categories in resolution order
    pub const ORDER: [ConflictPriority; 4] = [
        ConflictPriority::PatientSafety,
        ConflictPriority::GuidelineEvidence,
        ConflictPriority::DrugInteraction,
        ConflictPriority::ProgressionRisk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ConflictPriority::PatientSafety => "immediate patient safety",
            ConflictPriority::GuidelineEvidence => "guideline evidence",
            ConflictPriority::DrugInteraction => "drug interaction / contraindication",
            ConflictPriority::ProgressionRisk => "long-term progression risk",
            ConflictPriority::Unranked => "unranked",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            ConflictPriority::PatientSafety => &[
                "safety",
                "unsafe",
                "hypoglycemia",
                "hypoglycaemia",
                "ketoacidosis",
                "dka",
                "hyperkalemia",
                "hyperkalaemia",
                "lactic acidosis",
                "aki",
                "acute kidney injury",
                "bleeding",
                "aspiration",
                "hypotension",
                "arrhythmia",
                "life-threatening",
            ],
            ConflictPriority::GuidelineEvidence => &[
                "guideline",
                "kdigo",
                "esc",
                "ada",
                "acc",
                "aha",
                "class i",
                "evidence",
                "trial",
            ],
            ConflictPriority::DrugInteraction => &[
                "interaction",
                "interacts",
                "contraindicated",
                "contraindication",
                "allergy",
                "intolerance",
            ],
            ConflictPriority::ProgressionRisk => &[
                "progression",
                "decline",
                "long-term",
                "mortality",
                "outcomes",
                "renoprotection",
                "renoprotective",
                "cardioprotective",
            ],
            ConflictPriority::Unranked => &[],
        }
    }

    /// Highest-ranked category whose keywords appear in `text`
    pub fn classify(text: &str) -> ConflictPriority {
        let lower = text.to_lowercase();
        ConflictPriority::ORDER
            .into_iter()
            .find(|p| p.keywords().iter().any(|k| contains_word(&lower, k)))
            .unwrap_or(ConflictPriority::Unranked)
    }
}

/// One role's stated action for a medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePosition {
    pub role: Role,
    pub action: MedAction,
    /// Payload line the position was read from
    pub statement: String,
    pub basis: ConflictPriority,
}

/// Different actions asserted for the same medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationConflict {
    pub item: MedicationClass,
    pub positions: Vec<RolePosition>,
}

/// Why a resolution was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "priority")]
pub enum ResolutionBasis {
    SafetyOverride,
    Priority(ConflictPriority),
}

impl std::fmt::Display for ResolutionBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionBasis::SafetyOverride => write!(f, "safety override"),
            ResolutionBasis::Priority(p) => write!(f, "{}", p.label()),
        }
    }
}

/// Outcome applied to the Snapshot for one conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub item: MedicationClass,
    pub action: MedAction,
    /// Role whose position prevailed; `None` when a safety override decided
    pub winner: Option<Role>,
    pub overruled: Vec<Role>,
    pub basis: ResolutionBasis,
}

impl Resolution {
    pub fn summary(&self) -> String {
        let decided_by = match &self.winner {
            Some(role) => role.display_name(),
            None => "Safety override".to_string(),
        };
        format!(
            "{}: {} ({} per {})",
            self.item.label(),
            self.action.verb().to_lowercase(),
            decided_by,
            self.basis
        )
    }
}

/// Split a payload line into clauses at `;`, `,`, sentence ends and " and "
fn clauses(statement: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for part in statement.split([';', ',']) {
        for sentence in part.split(". ") {
            out.extend(
                sentence
                    .split(" and ")
                    .map(|c| c.trim().trim_end_matches('.'))
                    .filter(|c| !c.is_empty()),
            );
        }
    }
    out
}

/// Action for each medication a line mentions.
///
/// The verb is read from the clause naming the medication; a clause without
/// a verb ("hold metformin and empagliflozin") inherits the previous one.
fn line_positions(statement: &str) -> Vec<(MedicationClass, MedAction)> {
    let mut found: Vec<(MedicationClass, MedAction)> = Vec::new();
    let mut current: Option<MedAction> = None;
    for clause in clauses(statement) {
        if let Some(action) = MedAction::detect(clause) {
            current = Some(action);
        }
        let Some(action) = current else {
            continue;
        };
        for item in MedicationClass::ALL {
            if item.is_mentioned_in(clause) && !found.iter().any(|(i, _)| *i == item) {
                found.push((item, action));
            }
        }
    }
    found
}

/// First line per (role, medication) that states an action
pub fn detect_positions(joined: &JoinedAssessment) -> BTreeMap<MedicationClass, Vec<RolePosition>> {
    let mut positions: BTreeMap<MedicationClass, Vec<RolePosition>> = BTreeMap::new();
    for result in joined.successful() {
        for line in result.payload.lines() {
            let statement = strip_list_marker(line).replace('*', "");
            let statement = statement.trim();
            for (item, action) in line_positions(statement) {
                let entry = positions.entry(item).or_default();
                if entry.iter().any(|p| p.role == result.role) {
                    continue;
                }
                entry.push(RolePosition {
                    role: result.role.clone(),
                    action,
                    statement: statement.to_string(),
                    basis: ConflictPriority::classify(statement),
                });
            }
        }
    }
    positions
}

/// Medications on which roles disagree
pub fn detect_conflicts(joined: &JoinedAssessment) -> Vec<MedicationConflict> {
    detect_positions(joined)
        .into_iter()
        .filter(|(_, positions)| {
            positions
                .iter()
                .any(|p| p.action != positions[0].action)
        })
        .map(|(item, positions)| MedicationConflict { item, positions })
        .collect()
}

fn role_priority(roles: &[RoleSpec], role: &Role) -> u32 {
    roles
        .iter()
        .find(|spec| &spec.role == role)
        .map(|spec| spec.priority)
        .unwrap_or(u32::MAX)
}

/// Resolve a conflict; ties within a category go to the higher-priority role
pub fn resolve(
    conflict: &MedicationConflict,
    roles: &[RoleSpec],
    fired: &[SafetyOverride],
) -> Resolution {
    if let Some(ov) = fired.iter().find(|o| o.item == conflict.item) {
        let overruled = conflict
            .positions
            .iter()
            .filter(|p| p.action != ov.action)
            .map(|p| p.role.clone())
            .collect();
        return Resolution {
            item: conflict.item,
            action: ov.action,
            winner: None,
            overruled,
            basis: ResolutionBasis::SafetyOverride,
        };
    }

    let mut ranked: Vec<&RolePosition> = conflict.positions.iter().collect();
    ranked.sort_by_key(|p| (p.basis, role_priority(roles, &p.role)));
    // positions is never empty for a detected conflict
    let Some(winner) = ranked.first() else {
        return Resolution {
            item: conflict.item,
            action: MedAction::Hold,
            winner: None,
            overruled: Vec::new(),
            basis: ResolutionBasis::Priority(ConflictPriority::Unranked),
        };
    };
    Resolution {
        item: conflict.item,
        action: winner.action,
        winner: Some(winner.role.clone()),
        overruled: conflict
            .positions
            .iter()
            .filter(|p| p.action != winner.action)
            .map(|p| p.role.clone())
            .collect(),
        basis: ResolutionBasis::Priority(winner.basis),
    }
}

/// Make the next steps agree with each resolution.
///
/// Steps about the item that assert a different action are rewritten to the
/// resolved action; when no step mentions the item one is appended.
pub fn enforce_resolutions(snapshot: &mut Snapshot, resolutions: &[Resolution]) {
    for resolution in resolutions {
        let owner = resolution
            .winner
            .as_ref()
            .map(Role::display_name)
            .unwrap_or_else(|| resolution.item.guidance().owner.to_string());
        let mut mentioned = false;
        for step in snapshot
            .next_steps
            .iter_mut()
            .filter(|s| resolution.item.is_mentioned_in(&s.action))
        {
            mentioned = true;
            if MedAction::detect(&step.action) != Some(resolution.action) {
                step.action = format!("{} {}", resolution.action.verb(), resolution.item.label());
                if step.owner.is_empty() {
                    step.owner = owner.clone();
                }
                step.agreed_by.clear();
            }
        }
        if !mentioned {
            snapshot.next_steps.push(NextStep::new(
                format!("{} {}", resolution.action.verb(), resolution.item.label()),
                owner,
                "Today",
            ));
        }
        dedupe_item_steps(snapshot, resolution.item);
    }
}

/// Keep only the first step for `item` once rewriting made them identical
pub(crate) fn dedupe_item_steps(snapshot: &mut Snapshot, item: MedicationClass) {
    let mut seen: Vec<String> = Vec::new();
    snapshot.next_steps.retain(|step| {
        if !item.is_mentioned_in(&step.action) {
            return true;
        }
        let key = step.action.to_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::value_objects::AssessmentResult;
    use crate::synthesis::snapshot::Decision;

    fn joined(payloads: &[(Role, &str)]) -> JoinedAssessment {
        let results = payloads
            .iter()
            .map(|(role, text)| AssessmentResult::ok(role.clone(), *text, 1))
            .collect();
        JoinedAssessment::assemble(&RoleSpec::default_panel(), results)
    }

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            problem: "p".into(),
            facts: vec![],
            risks: vec![],
            decision: Decision {
                needed: true,
                rationale: String::new(),
            },
            next_steps: vec![],
            truncated: false,
        }
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            ConflictPriority::classify("risk of hyperkalemia and AKI"),
            ConflictPriority::PatientSafety
        );
        assert_eq!(
            ConflictPriority::classify("per KDIGO guideline"),
            ConflictPriority::GuidelineEvidence
        );
        assert_eq!(
            ConflictPriority::classify("slows CKD progression"),
            ConflictPriority::ProgressionRisk
        );
        assert_eq!(ConflictPriority::classify("nothing"), ConflictPriority::Unranked);
    }

    #[test]
    fn test_detect_conflict_between_roles() {
        let joined = joined(&[
            (
                Role::Cardiology,
                "- Continue lisinopril for cardioprotective benefit",
            ),
            (
                Role::Nephrology,
                "- Hold lisinopril 24h pre-op given hyperkalemia risk",
            ),
            (Role::Endocrinology, "- Continue statin"),
        ]);
        let conflicts = detect_conflicts(&joined);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].item, MedicationClass::AceiArb);
        assert_eq!(conflicts[0].positions.len(), 2);
    }

    #[test]
    fn test_multi_medication_line_reads_each_clause() {
        let joined = joined(&[
            (
                Role::Cardiology,
                "- Continue metoprolol; hold empagliflozin before the contrast study",
            ),
            (
                Role::Endocrinology,
                "- Hold empagliflozin before the contrast study",
            ),
        ]);
        assert!(detect_conflicts(&joined).is_empty());

        let positions = detect_positions(&joined);
        let sglt2 = &positions[&MedicationClass::Sglt2i];
        assert!(sglt2.iter().all(|p| p.action == MedAction::Hold));
        assert_eq!(
            positions[&MedicationClass::BetaBlocker][0].action,
            MedAction::Continue
        );
    }

    #[test]
    fn test_verbless_clause_inherits_previous_action() {
        assert_eq!(
            line_positions("Hold metformin and empagliflozin, continue atorvastatin"),
            vec![
                (MedicationClass::Metformin, MedAction::Hold),
                (MedicationClass::Sglt2i, MedAction::Hold),
                (MedicationClass::Statin, MedAction::Continue),
            ]
        );
    }

    #[test]
    fn test_safety_beats_progression_regardless_of_role_order() {
        let joined = joined(&[
            (
                Role::Cardiology,
                "- Continue lisinopril for cardioprotective benefit",
            ),
            (
                Role::Nephrology,
                "- Hold lisinopril 24h pre-op given hyperkalemia risk",
            ),
        ]);
        let conflicts = detect_conflicts(&joined);
        let resolution = resolve(&conflicts[0], &RoleSpec::default_panel(), &[]);
        assert_eq!(resolution.action, MedAction::Hold);
        assert_eq!(resolution.winner, Some(Role::Nephrology));
        assert_eq!(resolution.overruled, vec![Role::Cardiology]);
        assert_eq!(
            resolution.basis,
            ResolutionBasis::Priority(ConflictPriority::PatientSafety)
        );
    }

    #[test]
    fn test_tie_goes_to_role_priority() {
        let joined = joined(&[
            (Role::Cardiology, "- Continue furosemide"),
            (Role::Nephrology, "- Hold furosemide on the day"),
        ]);
        let conflicts = detect_conflicts(&joined);
        let resolution = resolve(&conflicts[0], &RoleSpec::default_panel(), &[]);
        assert_eq!(resolution.winner, Some(Role::Cardiology));
        assert_eq!(resolution.action, MedAction::Continue);
    }

    #[test]
    fn test_enforce_rewrites_contradicting_step() {
        let mut snap = empty_snapshot();
        snap.next_steps = vec![
            NextStep::new("Continue lisinopril", "Cardiology", "peri-op"),
            NextStep::new("Repeat eGFR", "Nephrology", "48h"),
        ];
        let resolution = Resolution {
            item: MedicationClass::AceiArb,
            action: MedAction::Hold,
            winner: Some(Role::Nephrology),
            overruled: vec![Role::Cardiology],
            basis: ResolutionBasis::Priority(ConflictPriority::PatientSafety),
        };
        enforce_resolutions(&mut snap, &[resolution]);
        assert_eq!(snap.next_steps[0].action, "Hold ACE inhibitor / ARB");
        assert_eq!(snap.next_steps.len(), 2);
    }

    #[test]
    fn test_enforce_appends_missing_step() {
        let mut snap = empty_snapshot();
        let resolution = Resolution {
            item: MedicationClass::Metformin,
            action: MedAction::Stop,
            winner: None,
            overruled: vec![],
            basis: ResolutionBasis::SafetyOverride,
        };
        enforce_resolutions(&mut snap, &[resolution]);
        assert_eq!(snap.next_steps.len(), 1);
        assert_eq!(snap.next_steps[0].action, "Stop Metformin");
        assert_eq!(snap.next_steps[0].owner, "Endocrinology");
    }
}
