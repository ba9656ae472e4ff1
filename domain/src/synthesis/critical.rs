//! Missing-data policy for critical fields

use super::snapshot::{MAX_FACTS, Snapshot, SnapshotItem};
use crate::case::entities::Case;
use crate::case::field::CaseField;
use serde::{Deserialize, Serialize};

/// A critical field and the sentence injected when it is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalFieldRule {
    pub field: CaseField,
    pub flag: String,
}

impl CriticalFieldRule {
    pub fn new(field: CaseField) -> Self {
        Self {
            field,
            flag: default_flag(field),
        }
    }
}

/// Flag sentence used for a field when none is configured
pub fn default_flag(field: CaseField) -> String {
    match field {
        CaseField::EjectionFraction => "HF phenotype unclear; EF not provided".to_string(),
        CaseField::Egfr => "CKD staging unclear; eGFR not provided".to_string(),
        CaseField::Hba1c => "Glycemic control unclear; HbA1c not provided".to_string(),
        other => format!("{} not provided", other.label()),
    }
}

/// EF, eGFR and HbA1c
pub fn default_rules() -> Vec<CriticalFieldRule> {
    [CaseField::EjectionFraction, CaseField::Egfr, CaseField::Hba1c]
        .into_iter()
        .map(CriticalFieldRule::new)
        .collect()
}

/// Rules whose field is unset in `case`, in rule order
pub fn missing_rules<'a>(case: &Case, rules: &'a [CriticalFieldRule]) -> Vec<&'a CriticalFieldRule> {
    rules.iter().filter(|r| !case.is_set(r.field)).collect()
}

/// Put each flag at the top of the facts exactly once.
///
/// Existing identical lines are removed first, then the remaining facts are
/// cut so the section stays within its cap; flags are never the ones cut.
pub fn inject_flags(snapshot: &mut Snapshot, flags: &[String]) {
    if flags.is_empty() {
        return;
    }
    snapshot.facts.retain(|f| !flags.contains(&f.text));
    let mut facts: Vec<SnapshotItem> = flags.iter().map(SnapshotItem::new).collect();
    let room = MAX_FACTS.saturating_sub(facts.len());
    facts.extend(std::mem::take(&mut snapshot.facts).into_iter().take(room));
    snapshot.facts = facts;
}
