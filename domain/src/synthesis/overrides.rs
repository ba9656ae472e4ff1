//! Safety-override table for named high-risk medications.
//!
//! An override whose condition holds for the case decides the action for its
//! medication outright, regardless of what the providers said.

use super::conflict::dedupe_item_steps;
use super::snapshot::{NextStep, Snapshot};
use crate::case::entities::Case;
use crate::case::field::CaseField;
use crate::core::error::DomainError;
use crate::medication::{MedAction, MedicationClass};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// When an override fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverrideCondition {
    Always,
    /// The case is peri-operative
    Periop,
    EgfrBelow(f64),
    EfBelow(f64),
    Hba1cAbove(f64),
    /// The case text records a contraindication, allergy or intolerance for the item
    DocumentedContraindication,
}

impl OverrideCondition {
    pub fn is_met(&self, case: &Case, item: MedicationClass) -> bool {
        match self {
            OverrideCondition::Always => true,
            OverrideCondition::Periop => case.periop() == Some(true),
            OverrideCondition::EgfrBelow(limit) => {
                case.measure(CaseField::Egfr).is_some_and(|v| v < *limit)
            }
            OverrideCondition::EfBelow(limit) => case
                .measure(CaseField::EjectionFraction)
                .is_some_and(|v| v < *limit),
            OverrideCondition::Hba1cAbove(limit) => {
                case.measure(CaseField::Hba1c).is_some_and(|v| v > *limit)
            }
            OverrideCondition::DocumentedContraindication => documents_contraindication(case, item),
        }
    }
}

fn documents_contraindication(case: &Case, item: MedicationClass) -> bool {
    const MARKERS: [&str; 3] = ["contraindicat", "allerg", "intoleran"];
    let mut texts: Vec<&str> = case
        .fields()
        .filter_map(|(_, value)| value.as_text())
        .collect();
    if let Some(meds) = case.medications() {
        texts.extend(meds.iter().map(String::as_str));
    }
    texts
        .iter()
        .flat_map(|t| t.split(['.', ';', '\n']))
        .any(|sentence| {
            let lower = sentence.to_lowercase();
            item.is_mentioned_in(sentence) && MARKERS.iter().any(|m| lower.contains(m))
        })
}

impl std::fmt::Display for OverrideCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideCondition::Always => write!(f, "always"),
            OverrideCondition::Periop => write!(f, "periop"),
            OverrideCondition::EgfrBelow(v) => write!(f, "egfr_below:{}", v),
            OverrideCondition::EfBelow(v) => write!(f, "ef_below:{}", v),
            OverrideCondition::Hba1cAbove(v) => write!(f, "hba1c_above:{}", v),
            OverrideCondition::DocumentedContraindication => write!(f, "contraindication"),
        }
    }
}

impl std::str::FromStr for OverrideCondition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let (name, arg) = match normalized.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (normalized.as_str(), None),
        };
        let threshold = || -> Result<f64, DomainError> {
            arg.and_then(|a| a.parse::<f64>().ok())
                .ok_or_else(|| DomainError::InvalidOverride(s.to_string()))
        };
        match name {
            "always" => Ok(OverrideCondition::Always),
            "periop" | "peri_op" | "surgery" => Ok(OverrideCondition::Periop),
            "egfr_below" => Ok(OverrideCondition::EgfrBelow(threshold()?)),
            "ef_below" => Ok(OverrideCondition::EfBelow(threshold()?)),
            "hba1c_above" => Ok(OverrideCondition::Hba1cAbove(threshold()?)),
            "contraindication" | "documented_contraindication" => {
                Ok(OverrideCondition::DocumentedContraindication)
            }
            _ => Err(DomainError::InvalidOverride(s.to_string())),
        }
    }
}

impl Serialize for OverrideCondition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OverrideCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of the safety-override table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyOverride {
    pub item: MedicationClass,
    pub condition: OverrideCondition,
    pub action: MedAction,
    #[serde(default)]
    pub note: String,
    /// Timing written into the next step; empty keeps the provider's timing
    #[serde(default)]
    pub timing: String,
}

impl SafetyOverride {
    pub fn directive(&self) -> String {
        let mut text = format!("{} {}", self.action.verb(), self.item.label());
        if !self.timing.is_empty() {
            text.push_str(&format!(" ({})", self.timing));
        }
        if !self.note.is_empty() {
            text.push_str(&format!(": {}", self.note));
        }
        text
    }
}

/// Built-in table
pub fn default_overrides() -> Vec<SafetyOverride> {
    vec![
        SafetyOverride {
            item: MedicationClass::Metformin,
            condition: OverrideCondition::EgfrBelow(30.0),
            action: MedAction::Stop,
            note: "Contraindicated when eGFR < 30".to_string(),
            timing: "Now".to_string(),
        },
        SafetyOverride {
            item: MedicationClass::Sglt2i,
            condition: OverrideCondition::Periop,
            action: MedAction::Hold,
            note: "Euglycemic DKA risk around surgery".to_string(),
            timing: "3-4 days pre-op".to_string(),
        },
        SafetyOverride {
            item: MedicationClass::Glp1Ra,
            condition: OverrideCondition::Periop,
            action: MedAction::Hold,
            note: "Aspiration risk with delayed gastric emptying".to_string(),
            timing: "1 week pre-op for weekly formulations".to_string(),
        },
        SafetyOverride {
            item: MedicationClass::AceiArb,
            condition: OverrideCondition::DocumentedContraindication,
            action: MedAction::Stop,
            note: "Documented contraindication".to_string(),
            timing: "Now".to_string(),
        },
    ]
}

/// Whether the case mentions `item` in its medication list or free text
pub fn case_mentions(case: &Case, item: MedicationClass) -> bool {
    case.fields().any(|(_, value)| match (value.as_text(), value.as_list()) {
        (Some(text), _) => item.is_mentioned_in(text),
        (_, Some(list)) => list.iter().any(|m| item.is_mentioned_in(m)),
        _ => false,
    })
}

/// Overrides that fire for `case`; the first entry per medication wins.
///
/// Only medications the case mentions are considered.
pub fn evaluate(overrides: &[SafetyOverride], case: &Case) -> Vec<SafetyOverride> {
    let mut fired: Vec<SafetyOverride> = Vec::new();
    for ov in overrides {
        if fired.iter().any(|f| f.item == ov.item) || !case_mentions(case, ov.item) {
            continue;
        }
        if ov.condition.is_met(case, ov.item) {
            fired.push(ov.clone());
        }
    }
    fired
}

/// Rewrite (or insert) the next step for each fired override
pub fn apply_overrides(snapshot: &mut Snapshot, fired: &[SafetyOverride]) {
    for ov in fired {
        let action = format!("{} {}", ov.action.verb(), ov.item.label());
        let mut matched = false;
        for step in snapshot
            .next_steps
            .iter_mut()
            .filter(|s| ov.item.is_mentioned_in(&s.action))
        {
            matched = true;
            if MedAction::detect(&step.action) != Some(ov.action) {
                step.action = action.clone();
                step.agreed_by.clear();
            }
            if !ov.timing.is_empty() {
                step.timing = ov.timing.clone();
            }
            if step.owner.is_empty() {
                step.owner = ov.item.guidance().owner.to_string();
            }
        }
        if !matched {
            snapshot.next_steps.insert(
                0,
                NextStep::new(action, ov.item.guidance().owner, ov.timing.clone()),
            );
        }
        dedupe_item_steps(snapshot, ov.item);
    }
}
