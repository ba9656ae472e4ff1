//! Case field catalogue and field values

use serde::{Deserialize, Serialize};

/// Named attribute of a consultation case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseField {
    PrimaryQuestion,
    Periop,
    Procedure,
    Cardiac,
    Kidney,
    Metabolic,
    EjectionFraction,
    Egfr,
    Hba1c,
    Medications,
    Concerns,
}

/// Kind of value a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Measure,
    List,
}

impl CaseField {
    pub const ALL: [CaseField; 11] = [
        CaseField::PrimaryQuestion,
        CaseField::Periop,
        CaseField::Procedure,
        CaseField::Cardiac,
        CaseField::Kidney,
        CaseField::Metabolic,
        CaseField::EjectionFraction,
        CaseField::Egfr,
        CaseField::Hba1c,
        CaseField::Medications,
        CaseField::Concerns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseField::PrimaryQuestion => "primary_question",
            CaseField::Periop => "periop",
            CaseField::Procedure => "procedure",
            CaseField::Cardiac => "cardiac",
            CaseField::Kidney => "kidney",
            CaseField::Metabolic => "metabolic",
            CaseField::EjectionFraction => "ejection_fraction",
            CaseField::Egfr => "egfr",
            CaseField::Hba1c => "hba1c",
            CaseField::Medications => "medications",
            CaseField::Concerns => "concerns",
        }
    }

    /// Label used when showing the case back to the user
    pub fn label(&self) -> &'static str {
        match self {
            CaseField::PrimaryQuestion => "Primary Question",
            CaseField::Periop => "Peri-operative",
            CaseField::Procedure => "Procedure",
            CaseField::Cardiac => "Cardiac",
            CaseField::Kidney => "Kidney",
            CaseField::Metabolic => "Metabolic",
            CaseField::EjectionFraction => "EF",
            CaseField::Egfr => "eGFR",
            CaseField::Hba1c => "HbA1c",
            CaseField::Medications => "Medications",
            CaseField::Concerns => "Additional Concerns",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            CaseField::Periop => FieldKind::Flag,
            CaseField::EjectionFraction | CaseField::Egfr | CaseField::Hba1c => {
                FieldKind::Measure
            }
            CaseField::Medications => FieldKind::List,
            _ => FieldKind::Text,
        }
    }

    /// Unit appended when a measurement is displayed
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            CaseField::EjectionFraction | CaseField::Hba1c => Some("%"),
            CaseField::Egfr => Some("mL/min/1.73m²"),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CaseField {
    type Err = String;

    /// Accepts canonical names plus the aliases clinicians commonly paste
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let key = key.trim_matches('_');
        Ok(match key {
            "primary_question" | "question" | "primary_clinical_question" | "reason" => {
                CaseField::PrimaryQuestion
            }
            "periop" | "peri_op" | "peri_operative" | "perioperative" | "surgery" => {
                CaseField::Periop
            }
            "procedure" | "procedure_details" | "planned_procedure" => CaseField::Procedure,
            "cardiac" | "heart" | "cardiology" => CaseField::Cardiac,
            "kidney" | "renal" | "nephrology" => CaseField::Kidney,
            "metabolic" | "diabetes" | "endocrine" => CaseField::Metabolic,
            "ejection_fraction" | "ef" | "lvef" => CaseField::EjectionFraction,
            "egfr" | "gfr" => CaseField::Egfr,
            "hba1c" | "a1c" | "hemoglobin_a1c" => CaseField::Hba1c,
            "medications" | "meds" | "medication" | "current_medications" => {
                CaseField::Medications
            }
            "concerns" | "additional_concerns" | "notes" | "comorbidities" => CaseField::Concerns,
            other => return Err(format!("unknown case field '{}'", other)),
        })
    }
}

/// Value held by a set case field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Measure(f64),
    List(Vec<String>),
    Text(String),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_measure(&self) -> Option<f64> {
        match self {
            FieldValue::Measure(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value can be stored in a field of `kind`
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Text(_), FieldKind::Text)
                | (FieldValue::Flag(_), FieldKind::Flag)
                | (FieldValue::Measure(_), FieldKind::Measure)
                | (FieldValue::List(_), FieldKind::List)
        )
    }

    /// Human-readable rendering, with the field's unit for measurements
    pub fn display_for(&self, field: CaseField) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Flag(true) => "Yes".to_string(),
            FieldValue::Flag(false) => "No".to_string(),
            FieldValue::Measure(v) => {
                let num = if v.fract() == 0.0 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                };
                match field.unit() {
                    Some("%") => format!("{}%", num),
                    Some(unit) => format!("{} {}", num, unit),
                    None => num,
                }
            }
            FieldValue::List(items) if items.is_empty() => "None".to_string(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}
