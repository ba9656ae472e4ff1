//! Detection of recommendations repeated across specialist payloads

use super::snapshot::{NextStep, Snapshot, SnapshotItem};
use crate::assessment::role::Role;
use crate::assessment::value_objects::JoinedAssessment;
use crate::core::string::{normalize_item, strip_list_marker, word_count};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Containment matches need at least this many characters on the shorter side
const MIN_CONTAINED_LEN: usize = 12;

/// A recommendation stated by two or more roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    /// Wording from the highest-priority role that stated it
    pub text: String,
    /// Normalized comparison key
    pub key: String,
    /// Agreeing roles in priority order
    pub roles: Vec<Role>,
}

/// Whether two normalized keys describe the same recommendation
pub fn keys_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_CONTAINED_LEN && long.contains(short)
}

fn candidate_lines(payload: &str) -> Vec<(String, String)> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for line in payload.lines() {
        let trimmed = line.trim();
        let is_list_item = strip_list_marker(trimmed).len() != trimmed.len();
        if !is_list_item || trimmed.ends_with(':') {
            continue;
        }
        let key = normalize_item(trimmed);
        if word_count(&key) < 2 || !seen.insert(key.clone()) {
            continue;
        }
        let text: String = strip_list_marker(trimmed)
            .chars()
            .filter(|c| *c != '*')
            .collect();
        out.push((key, text.trim().to_string()));
    }
    out
}

/// Find list items that appear in at least two successful role payloads.
///
/// Results are ordered by where they first appear in the highest-priority
/// payload.
pub fn find_agreements(joined: &JoinedAssessment) -> Vec<Agreement> {
    let per_role: Vec<(&Role, Vec<(String, String)>)> = joined
        .successful()
        .map(|r| (&r.role, candidate_lines(&r.payload)))
        .collect();

    let mut agreements: Vec<Agreement> = Vec::new();
    for (idx, (role, lines)) in per_role.iter().enumerate() {
        for (key, text) in lines {
            if agreements.iter().any(|a| keys_match(&a.key, key)) {
                continue;
            }
            let mut roles = vec![(*role).clone()];
            for (other_role, other_lines) in per_role.iter().skip(idx + 1) {
                if other_lines.iter().any(|(k, _)| keys_match(k, key)) {
                    roles.push((*other_role).clone());
                }
            }
            if roles.len() >= 2 {
                agreements.push(Agreement {
                    text: text.clone(),
                    key: key.clone(),
                    roles,
                });
            }
        }
    }
    agreements
}

fn matching_agreement(agreements: &[Agreement], key: &str) -> Option<usize> {
    agreements.iter().position(|a| keys_match(&a.key, key))
}

fn merge_roles(into: &mut Vec<Role>, from: &[Role]) {
    for role in from {
        if !into.contains(role) {
            into.push(role.clone());
        }
    }
}

/// Collapse duplicates within one list and annotate items matching an agreement
fn collapse<T>(
    items: Vec<T>,
    agreements: &[Agreement],
    key_of: impl Fn(&T) -> String,
    roles_of: impl Fn(&mut T) -> &mut Vec<Role>,
) -> Vec<T> {
    let mut kept: Vec<(String, Option<usize>, T)> = Vec::new();
    for mut item in items {
        let key = normalize_item(&key_of(&item));
        let agreement = matching_agreement(agreements, &key);
        if let Some(idx) = agreement {
            merge_roles(roles_of(&mut item), &agreements[idx].roles);
        }

        let duplicate = kept.iter_mut().find(|(k, a, _)| {
            (agreement.is_some() && *a == agreement) || keys_match(k, &key)
        });
        match duplicate {
            Some((_, _, existing)) => {
                let roles = roles_of(&mut item).clone();
                merge_roles(roles_of(existing), &roles);
            }
            None => kept.push((key, agreement, item)),
        }
    }
    kept.into_iter().map(|(_, _, item)| item).collect()
}

fn item_roles(item: &mut SnapshotItem) -> &mut Vec<Role> {
    &mut item.agreed_by
}

fn step_roles(step: &mut NextStep) -> &mut Vec<Role> {
    &mut step.agreed_by
}

/// Annotate agreed items and drop their duplicates in facts, risks and next steps
pub fn apply_agreements(snapshot: &mut Snapshot, agreements: &[Agreement]) {
    let item_key = |i: &SnapshotItem| i.text.clone();

    snapshot.facts = collapse(std::mem::take(&mut snapshot.facts), agreements, item_key, item_roles);
    snapshot.risks = collapse(std::mem::take(&mut snapshot.risks), agreements, item_key, item_roles);
    snapshot.next_steps = collapse(
        std::mem::take(&mut snapshot.next_steps),
        agreements,
        |s: &NextStep| s.action.clone(),
        step_roles,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::role::RoleSpec;
    use crate::assessment::value_objects::AssessmentResult;
    use crate::synthesis::snapshot::Decision;

    fn joined(payloads: &[(Role, &str)]) -> JoinedAssessment {
        let results = payloads
            .iter()
            .map(|(role, text)| AssessmentResult::ok(role.clone(), *text, 1))
            .collect();
        JoinedAssessment::assemble(&RoleSpec::default_panel(), results)
    }

    #[test]
    fn test_find_agreement_across_roles() {
        let joined = joined(&[
            (
                Role::Cardiology,
                "Plan:\n- Hold ACE inhibitor 24h pre-op\n- Continue beta-blocker",
            ),
            (
                Role::Nephrology,
                "Recommendations:\n1. **Hold ACE inhibitor 24h pre-op.**\n2. Avoid contrast",
            ),
            (Role::Endocrinology, "- Hold SGLT2 inhibitor 3 days pre-op"),
        ]);
        let agreements = find_agreements(&joined);
        assert_eq!(agreements.len(), 1);
        assert_eq!(agreements[0].key, "hold ace inhibitor 24h pre-op");
        assert_eq!(agreements[0].roles, vec![Role::Cardiology, Role::Nephrology]);
    }

    #[test]
    fn test_failed_roles_not_counted() {
        let results = vec![
            AssessmentResult::ok(Role::Cardiology, "- Hold ACE inhibitor 24h pre-op", 1),
            AssessmentResult::failed(Role::Nephrology, "boom", 1),
        ];
        let joined = JoinedAssessment::assemble(&RoleSpec::default_panel(), results);
        assert!(find_agreements(&joined).is_empty());
    }

    #[test]
    fn test_apply_collapses_duplicate_steps() {
        let agreements = vec![Agreement {
            text: "Hold ACE inhibitor 24h pre-op".to_string(),
            key: "hold ace inhibitor 24h pre-op".to_string(),
            roles: vec![Role::Cardiology, Role::Nephrology],
        }];
        let mut snapshot = Snapshot {
            problem: "p".to_string(),
            facts: vec![],
            risks: vec![],
            decision: Decision {
                needed: true,
                rationale: String::new(),
            },
            next_steps: vec![
                NextStep::new("Hold ACE inhibitor 24h pre-op", "Cardiology", "pre-op"),
                NextStep::new("Repeat eGFR", "Nephrology", "48h"),
                NextStep::new("hold ACE inhibitor 24h pre-op", "Nephrology", "pre-op"),
            ],
            truncated: false,
        };
        apply_agreements(&mut snapshot, &agreements);
        assert_eq!(snapshot.next_steps.len(), 2);
        assert_eq!(
            snapshot.next_steps[0].agreed_by,
            vec![Role::Cardiology, Role::Nephrology]
        );
        assert!(snapshot.next_steps[1].agreed_by.is_empty());
    }

    #[test]
    fn test_keys_match_containment() {
        assert!(keys_match("hold ace inhibitor", "hold ace inhibitor 24h pre-op"));
        assert!(!keys_match("hold ace", "hold ace inhibitor"));
    }
}
