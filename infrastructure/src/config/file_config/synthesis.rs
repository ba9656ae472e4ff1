//! Synthesis configuration from TOML (`[synthesis]` section)

use ckm_domain::synthesis::critical::default_rules;
use ckm_domain::synthesis::overrides::default_overrides;
use ckm_domain::synthesis::snapshot::{DEFAULT_WORD_LIMIT, MAX_FACTS};
use ckm_domain::{
    CaseField, ConfigIssue, ConfigIssueCode, CriticalFieldRule, MedAction, MedicationClass,
    OverrideCondition, SafetyOverride,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `[[synthesis.safety_overrides]]` entry, kept as strings until validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOverrideConfig {
    /// Medication class key or drug name ("metformin", "empagliflozin", ...)
    pub item: String,
    /// "always", "periop", "egfr_below:30", "ef_below:40", "hba1c_above:9", "contraindication"
    pub condition: String,
    pub action: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub timing: String,
}

impl FileOverrideConfig {
    pub fn parse(&self) -> Result<SafetyOverride, ConfigIssue> {
        let item: MedicationClass = self.item.parse().map_err(|e: String| {
            ConfigIssue::error(
                ConfigIssueCode::UnknownOverrideItem,
                format!("synthesis.safety_overrides: {}", e),
            )
        })?;
        let condition: OverrideCondition = self.condition.parse().map_err(|e| {
            ConfigIssue::error(
                ConfigIssueCode::InvalidOverride,
                format!("synthesis.safety_overrides[{}]: {}", self.item, e),
            )
        })?;
        let action: MedAction = self.action.parse().map_err(|e: String| {
            ConfigIssue::error(
                ConfigIssueCode::InvalidOverride,
                format!("synthesis.safety_overrides[{}]: {}", self.item, e),
            )
        })?;
        Ok(SafetyOverride {
            item,
            condition,
            action,
            note: self.note.clone(),
            timing: self.timing.clone(),
        })
    }
}

impl From<&SafetyOverride> for FileOverrideConfig {
    fn from(ov: &SafetyOverride) -> Self {
        Self {
            item: ov.item.key().to_string(),
            condition: ov.condition.to_string(),
            action: ov.action.verb().to_lowercase(),
            note: ov.note.clone(),
            timing: ov.timing.clone(),
        }
    }
}

/// Raw synthesis configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSynthesisConfig {
    /// Rendered Snapshot word limit
    pub word_limit: usize,
    /// Regenerations after the first attempt
    pub max_retries: u32,
    /// Fields whose absence is flagged in Key Facts
    pub critical_fields: Vec<String>,
    /// Replacement flag sentences keyed by field name
    pub critical_flags: BTreeMap<String, String>,
    pub safety_overrides: Vec<FileOverrideConfig>,
}

impl Default for FileSynthesisConfig {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
            max_retries: 1,
            critical_fields: default_rules()
                .iter()
                .map(|r| r.field.as_str().to_string())
                .collect(),
            critical_flags: BTreeMap::new(),
            safety_overrides: default_overrides()
                .iter()
                .map(FileOverrideConfig::from)
                .collect(),
        }
    }
}

impl FileSynthesisConfig {
    /// Parse critical-field rules; unknown names are skipped and reported
    pub fn parse_critical_fields(&self) -> (Vec<CriticalFieldRule>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut rules: Vec<CriticalFieldRule> = Vec::new();

        for name in &self.critical_fields {
            match name.parse::<CaseField>() {
                Ok(field) if rules.iter().any(|r| r.field == field) => {}
                Ok(field) => rules.push(CriticalFieldRule::new(field)),
                Err(e) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownCriticalField,
                    format!("synthesis.critical_fields: {}", e),
                )),
            }
        }

        for (name, flag) in &self.critical_flags {
            match name.parse::<CaseField>() {
                Ok(field) => {
                    if let Some(rule) = rules.iter_mut().find(|r| r.field == field) {
                        rule.flag = flag.clone();
                    } else {
                        issues.push(ConfigIssue::warning(
                            ConfigIssueCode::UnknownCriticalField,
                            format!(
                                "synthesis.critical_flags: '{}' is not a critical field",
                                name
                            ),
                        ));
                    }
                }
                Err(e) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownCriticalField,
                    format!("synthesis.critical_flags: {}", e),
                )),
            }
        }

        if rules.len() > MAX_FACTS {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::TooManyCriticalFields,
                format!(
                    "synthesis.critical_fields: {} fields exceed the {} Key Facts slots",
                    rules.len(),
                    MAX_FACTS
                ),
            ));
        }

        (rules, issues)
    }

    pub fn parse_overrides(&self) -> (Vec<SafetyOverride>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut overrides = Vec::new();
        for entry in &self.safety_overrides {
            match entry.parse() {
                Ok(ov) => overrides.push(ov),
                Err(issue) => issues.push(issue),
            }
        }
        (overrides, issues)
    }

    pub fn limit_issues(&self) -> Vec<ConfigIssue> {
        if self.word_limit == 0 {
            vec![ConfigIssue::error(
                ConfigIssueCode::ZeroWordLimit,
                "synthesis.word_limit cannot be 0",
            )]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_to_domain_tables() {
        let config = FileSynthesisConfig::default();
        let (rules, issues) = config.parse_critical_fields();
        assert!(issues.is_empty());
        assert_eq!(rules, default_rules());
        let (overrides, issues) = config.parse_overrides();
        assert!(issues.is_empty());
        assert_eq!(overrides, default_overrides());
    }

    #[test]
    fn test_unknown_critical_field() {
        let config = FileSynthesisConfig {
            critical_fields: vec!["egfr".into(), "potassium".into()],
            ..Default::default()
        };
        let (rules, issues) = config.parse_critical_fields();
        assert_eq!(rules.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownCriticalField);
    }

    #[test]
    fn test_too_many_critical_fields() {
        let config = FileSynthesisConfig {
            critical_fields: ["ef", "egfr", "a1c", "procedure", "cardiac", "kidney"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        };
        let (_, issues) = config.parse_critical_fields();
        assert!(
            issues
                .iter()
                .any(|i| i.code == ConfigIssueCode::TooManyCriticalFields)
        );
    }

    #[test]
    fn test_custom_flag_replaces_default_sentence() {
        let mut config = FileSynthesisConfig::default();
        config
            .critical_flags
            .insert("lvef".into(), "EF pending echo".into());
        let (rules, issues) = config.parse_critical_fields();
        assert!(issues.is_empty());
        let ef = rules
            .iter()
            .find(|r| r.field == CaseField::EjectionFraction)
            .unwrap();
        assert_eq!(ef.flag, "EF pending echo");
    }

    #[test]
    fn test_bad_override_condition() {
        let config = FileSynthesisConfig {
            safety_overrides: vec![FileOverrideConfig {
                item: "metformin".into(),
                condition: "egfr_below:low".into(),
                action: "hold".into(),
                note: String::new(),
                timing: String::new(),
            }],
            ..Default::default()
        };
        let (overrides, issues) = config.parse_overrides();
        assert!(overrides.is_empty());
        assert_eq!(issues[0].code, ConfigIssueCode::InvalidOverride);
    }

    #[test]
    fn test_unknown_override_item() {
        let config = FileSynthesisConfig {
            safety_overrides: vec![FileOverrideConfig {
                item: "unobtainium".into(),
                condition: "always".into(),
                action: "stop".into(),
                note: String::new(),
                timing: String::new(),
            }],
            ..Default::default()
        };
        let (_, issues) = config.parse_overrides();
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownOverrideItem);
    }
}
