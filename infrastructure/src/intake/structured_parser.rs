//! Deterministic paste parser
//!
//! Accepts either a JSON object keyed by case field names, or `Key: value`
//! lines such as a clinician would copy out of a note:
//!
//! ```text
//! Question: medication review before surgery
//! Periop: yes
//! Procedure: elective hip replacement
//! EF: 35%
//! eGFR: 42
//! Meds: metformin, empagliflozin, lisinopril
//! ```
//!
//! Keys accept the aliases of [`CaseField`]'s `FromStr`. Lines without a
//! recognized key continue the previous text or list field; measurements
//! such as "LVEF 35%" are also picked up from anywhere in the text. Input in
//! which nothing is recognized yields an empty diff.

use async_trait::async_trait;
use ckm_application::{IntakeParser, ProviderError};
use ckm_domain::case::extract::{extract_measurement, parse_yes_no, split_list};
use ckm_domain::core::string::strip_list_marker;
use ckm_domain::{CaseDiff, CaseField, FieldKind, FieldValue};
use serde_json::{Map, Value};
use tracing::debug;

const MEASURED: [CaseField; 3] = [CaseField::EjectionFraction, CaseField::Egfr, CaseField::Hba1c];

/// Keyed-text and JSON case parser
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredCaseParser;

impl StructuredCaseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse synchronously; JSON syntax errors are the only failure
    pub fn parse_text(&self, text: &str) -> Result<CaseDiff, ProviderError> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            let map: Map<String, Value> = serde_json::from_str(trimmed)
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid case JSON: {}", e)))?;
            return Ok(Self::from_json(&map));
        }
        Ok(Self::from_lines(trimmed))
    }

    /// Assign every recognized key of a JSON object
    pub fn from_json(map: &Map<String, Value>) -> CaseDiff {
        let mut diff = CaseDiff::new();
        for (key, value) in map {
            let Ok(field) = key.parse::<CaseField>() else {
                debug!("Ignoring unknown case key '{}'", key);
                continue;
            };
            match coerce_json(field, value) {
                Some(value) => diff.set(field, value),
                None => debug!("Ignoring unusable value for {}", field),
            }
        }
        diff
    }

    fn from_lines(text: &str) -> CaseDiff {
        let mut diff = CaseDiff::new();
        let mut current: Option<CaseField> = None;

        for raw in text.lines() {
            let line = strip_list_marker(raw).trim();
            if line.is_empty() {
                current = None;
                continue;
            }

            if let Some((field, value)) = keyed(line) {
                current = Some(field);
                match coerce_text(field, value) {
                    Some(parsed) => diff.set(field, parsed),
                    None => debug!("Ignoring unusable value for {}", field),
                }
                continue;
            }

            if let Some(field) = current {
                continue_field(&mut diff, field, line);
            }
        }

        for field in MEASURED {
            if diff.get(field).is_none()
                && let Some(value) = extract_measurement(text, field)
            {
                diff.set(field, FieldValue::Measure(value));
            }
        }
        diff
    }
}

#[async_trait]
impl IntakeParser for StructuredCaseParser {
    async fn parse(&self, text: &str) -> Result<CaseDiff, ProviderError> {
        self.parse_text(text)
    }
}

/// Split `Key: value` (or `Key = value`) when the key names a case field
fn keyed(line: &str) -> Option<(CaseField, &str)> {
    let split = line.find([':', '='])?;
    let key = line[..split].trim();
    if key.is_empty() || key.split_whitespace().count() > 4 {
        return None;
    }
    let field = key.parse::<CaseField>().ok()?;
    let value = line[split + 1..].trim().trim_start_matches('*').trim();
    Some((field, value))
}

fn continue_field(diff: &mut CaseDiff, field: CaseField, line: &str) {
    match (field.kind(), diff.get(field).cloned()) {
        (FieldKind::Text, Some(FieldValue::Text(existing))) => {
            diff.set(field, FieldValue::Text(format!("{} {}", existing, line)));
        }
        (FieldKind::Text, None) => diff.set(field, FieldValue::text(line)),
        (FieldKind::List, Some(FieldValue::List(mut items))) => {
            items.extend(split_list(line));
            diff.set(field, FieldValue::List(items));
        }
        (FieldKind::List, None) => diff.set(field, FieldValue::List(split_list(line))),
        _ => {}
    }
}

fn measure_in(field: CaseField, text: &str) -> Option<f64> {
    // Prefix the label so the shared extractor handles "approx 35%" and units
    extract_measurement(&format!("{} {}", field.label(), text), field)
}

fn coerce_text(field: CaseField, text: &str) -> Option<FieldValue> {
    if text.is_empty() {
        return None;
    }
    match field.kind() {
        FieldKind::Text => Some(FieldValue::text(text)),
        FieldKind::Flag => parse_yes_no(text).map(FieldValue::Flag),
        FieldKind::Measure => measure_in(field, text).map(FieldValue::Measure),
        FieldKind::List => Some(FieldValue::List(split_list(text))),
    }
}

fn coerce_json(field: CaseField, value: &Value) -> Option<FieldValue> {
    match (field.kind(), value) {
        (_, Value::Null) => None,
        (_, Value::String(s)) => coerce_text(field, s.trim()),
        (FieldKind::Text, Value::Number(n)) => Some(FieldValue::text(n.to_string())),
        (FieldKind::Text, Value::Array(items)) => {
            let parts: Vec<String> = items.iter().filter_map(json_item).collect();
            (!parts.is_empty()).then(|| FieldValue::text(parts.join("; ")))
        }
        (FieldKind::Flag, Value::Bool(b)) => Some(FieldValue::Flag(*b)),
        (FieldKind::Measure, Value::Number(n)) => n.as_f64().map(FieldValue::Measure),
        (FieldKind::List, Value::Array(items)) => {
            Some(FieldValue::List(items.iter().filter_map(json_item).collect()))
        }
        _ => None,
    }
}

fn json_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CaseDiff {
        StructuredCaseParser::new().parse_text(text).unwrap()
    }

    #[test]
    fn test_keyed_lines() {
        let diff = parse(
            "Question: medication review before surgery\n\
             Periop: yes\n\
             Procedure: elective hip replacement\n\
             - **EF:** 35%\n\
             eGFR = 42 mL/min\n\
             Meds: metformin 1g BID, empagliflozin 10mg, lisinopril 20mg",
        );
        assert_eq!(
            diff.get(CaseField::PrimaryQuestion),
            Some(&FieldValue::text("medication review before surgery"))
        );
        assert_eq!(diff.get(CaseField::Periop), Some(&FieldValue::Flag(true)));
        assert_eq!(
            diff.get(CaseField::EjectionFraction),
            Some(&FieldValue::Measure(35.0))
        );
        assert_eq!(diff.get(CaseField::Egfr), Some(&FieldValue::Measure(42.0)));
        let meds = diff.get(CaseField::Medications).unwrap().as_list().unwrap();
        assert_eq!(meds.len(), 3);
        assert_eq!(meds[1], "empagliflozin 10mg");
    }

    #[test]
    fn test_continuation_lines_extend_previous_field() {
        let diff = parse("Medications:\n- metformin\n- atorvastatin\n\nCardiac: HFrEF\nNYHA II");
        assert_eq!(
            diff.get(CaseField::Medications),
            Some(&FieldValue::List(vec![
                "metformin".into(),
                "atorvastatin".into()
            ]))
        );
        assert_eq!(
            diff.get(CaseField::Cardiac),
            Some(&FieldValue::text("HFrEF NYHA II"))
        );
    }

    #[test]
    fn test_measurements_found_in_free_text() {
        let diff = parse("Concerns: recent echo LVEF 30%, HbA1c was 8.1");
        assert_eq!(
            diff.get(CaseField::EjectionFraction),
            Some(&FieldValue::Measure(30.0))
        );
        assert_eq!(diff.get(CaseField::Hba1c), Some(&FieldValue::Measure(8.1)));
        assert!(diff.get(CaseField::Concerns).is_some());
    }

    #[test]
    fn test_unusable_values_are_skipped() {
        let diff = parse("EF: unknown\nPeriop: maybe\nKidney: CKD 3b");
        assert!(diff.get(CaseField::EjectionFraction).is_none());
        assert!(diff.get(CaseField::Periop).is_none());
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn test_unrecognized_text_yields_empty_diff() {
        assert!(parse("lorem ipsum dolor sit amet").is_empty());
        assert!(parse("Plan: follow up at 10:30").is_empty());
    }

    #[test]
    fn test_json_object() {
        let diff = parse(
            r#"{
                "primary_question": "Peri-op plan",
                "periop": true,
                "lvef": 40,
                "egfr": "28 mL/min",
                "medications": ["metformin", "semaglutide"],
                "blood_type": "O+"
            }"#,
        );
        assert_eq!(diff.len(), 5);
        assert_eq!(
            diff.get(CaseField::EjectionFraction),
            Some(&FieldValue::Measure(40.0))
        );
        assert_eq!(diff.get(CaseField::Egfr), Some(&FieldValue::Measure(28.0)));
        assert_eq!(diff.get(CaseField::Periop), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = StructuredCaseParser::new()
            .parse_text("{\"egfr\": ")
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_port_delegates_to_parse_text() {
        let parser = StructuredCaseParser::new();
        let diff = IntakeParser::parse(&parser, "A1c: 7.4").await.unwrap();
        assert_eq!(diff.get(CaseField::Hba1c), Some(&FieldValue::Measure(7.4)));
    }
}
