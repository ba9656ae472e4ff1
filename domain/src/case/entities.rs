//! Case entity and its immutable finalized handle

use super::field::{CaseField, FieldValue};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle of a case record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    /// Still being assembled by intake
    Draft,
    /// Submitted for assessment; no further mutation
    Final,
}

/// Ordered set of field assignments produced by one intake turn or parse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDiff {
    changes: BTreeMap<CaseField, FieldValue>,
}

impl CaseDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CaseField, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: CaseField, value: FieldValue) {
        self.changes.insert(field, value);
    }

    pub fn get(&self, field: CaseField) -> Option<&FieldValue> {
        self.changes.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CaseField, &FieldValue)> {
        self.changes.iter()
    }

    /// Merge `other` over this diff; later assignments win
    pub fn merge(&mut self, other: CaseDiff) {
        self.changes.extend(other.changes);
    }
}

/// Structured record of the consultation case being assembled
///
/// Fields absent from the map are *unset*, which is distinct from a field
/// set to an empty text or an empty medication list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    status: CaseStatus,
    fields: BTreeMap<CaseField, FieldValue>,
}

impl Default for Case {
    fn default() -> Self {
        Self::new()
    }
}

impl Case {
    /// Create an empty draft case
    pub fn new() -> Self {
        Self {
            status: CaseStatus::Draft,
            fields: BTreeMap::new(),
        }
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn is_draft(&self) -> bool {
        self.status == CaseStatus::Draft
    }

    /// Set a field on a draft case
    pub fn set(&mut self, field: CaseField, value: FieldValue) -> Result<(), DomainError> {
        if !self.is_draft() {
            return Err(DomainError::CaseFrozen);
        }
        if !value.fits(field.kind()) {
            return Err(DomainError::InvalidFieldValue {
                field: field.as_str().to_string(),
                value: format!("{:?}", value),
            });
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// Remove a field so that it reads as unset again
    pub fn unset(&mut self, field: CaseField) -> Result<(), DomainError> {
        if !self.is_draft() {
            return Err(DomainError::CaseFrozen);
        }
        self.fields.remove(&field);
        Ok(())
    }

    /// Apply every assignment of `diff`; nothing is applied if any value is invalid
    pub fn apply(&mut self, diff: &CaseDiff) -> Result<(), DomainError> {
        if !self.is_draft() {
            return Err(DomainError::CaseFrozen);
        }
        if let Some((field, value)) = diff.iter().find(|(f, v)| !v.fits(f.kind())) {
            return Err(DomainError::InvalidFieldValue {
                field: field.as_str().to_string(),
                value: format!("{:?}", value),
            });
        }
        for (field, value) in diff.iter() {
            self.fields.insert(*field, value.clone());
        }
        Ok(())
    }

    pub fn get(&self, field: CaseField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn is_set(&self, field: CaseField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn text(&self, field: CaseField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn measure(&self, field: CaseField) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_measure)
    }

    pub fn periop(&self) -> Option<bool> {
        self.get(CaseField::Periop).and_then(FieldValue::as_flag)
    }

    pub fn medications(&self) -> Option<&[String]> {
        self.get(CaseField::Medications).and_then(FieldValue::as_list)
    }

    pub fn primary_question(&self) -> Option<&str> {
        self.text(CaseField::PrimaryQuestion)
    }

    /// Iterate set fields in catalogue order
    pub fn fields(&self) -> impl Iterator<Item = (&CaseField, &FieldValue)> {
        self.fields.iter()
    }

    /// Freeze the draft; the returned handle is the only input fan-out accepts
    pub fn finalize(mut self) -> FinalCase {
        self.status = CaseStatus::Final;
        FinalCase(Arc::new(self))
    }

    /// Plain-text summary handed to providers, one `Label: value` line per set field
    pub fn summary(&self) -> String {
        self.fields
            .iter()
            .map(|(field, value)| format!("{}: {}", field.label(), value.display_for(*field)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Immutable, shareable handle to a finalized case
///
/// Cloning is cheap; every concurrent assessment receives its own clone of
/// the same read-only record.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalCase(Arc<Case>);

impl FinalCase {
    pub fn case(&self) -> &Case {
        &self.0
    }
}

impl std::ops::Deref for FinalCase {
    type Target = Case;

    fn deref(&self) -> &Case {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_distinct_from_empty() {
        let mut case = Case::new();
        assert!(!case.is_set(CaseField::Medications));
        case.set(CaseField::Medications, FieldValue::List(vec![]))
            .unwrap();
        assert!(case.is_set(CaseField::Medications));
        assert_eq!(case.medications(), Some(&[][..]));
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut case = Case::new();
        let err = case
            .set(CaseField::Periop, FieldValue::text("yes"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidFieldValue { .. }));
        assert!(!case.is_set(CaseField::Periop));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut case = Case::new();
        let diff = CaseDiff::new()
            .with(CaseField::PrimaryQuestion, FieldValue::text("Pre-op clearance"))
            .with(CaseField::Egfr, FieldValue::text("forty-five"));
        assert!(case.apply(&diff).is_err());
        assert!(!case.is_set(CaseField::PrimaryQuestion));
    }

    #[test]
    fn test_finalize_freezes() {
        let mut case = Case::new();
        case.set(CaseField::Periop, FieldValue::Flag(true)).unwrap();
        let final_case = case.finalize();
        assert_eq!(final_case.status(), CaseStatus::Final);
        assert_eq!(final_case.periop(), Some(true));

        let mut copy = final_case.case().clone();
        assert!(matches!(
            copy.set(CaseField::Periop, FieldValue::Flag(false)),
            Err(DomainError::CaseFrozen)
        ));
    }

    #[test]
    fn test_diff_merge_later_wins() {
        let mut diff = CaseDiff::new().with(CaseField::Egfr, FieldValue::Measure(40.0));
        diff.merge(CaseDiff::new().with(CaseField::Egfr, FieldValue::Measure(45.0)));
        assert_eq!(diff.get(CaseField::Egfr), Some(&FieldValue::Measure(45.0)));
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn test_summary_lines() {
        let mut case = Case::new();
        case.set(CaseField::PrimaryQuestion, FieldValue::text("Medication review"))
            .unwrap();
        case.set(CaseField::Egfr, FieldValue::Measure(45.0)).unwrap();
        assert_eq!(
            case.summary(),
            "Primary Question: Medication review\neGFR: 45 mL/min/1.73m²"
        );
    }
}
