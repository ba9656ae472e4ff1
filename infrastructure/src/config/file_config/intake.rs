//! Intake configuration from TOML (`[intake]` section)

use ckm_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Which adapter turns pasted notes into case fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeParserKind {
    /// Deterministic JSON / `Key: value` parser
    #[default]
    Structured,
    /// Model-backed extraction through the Ollama client
    Llm,
}

impl IntakeParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeParserKind::Structured => "structured",
            IntakeParserKind::Llm => "llm",
        }
    }
}

/// Raw intake configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIntakeConfig {
    /// "structured" or "llm"
    pub parser: String,
}

impl Default for FileIntakeConfig {
    fn default() -> Self {
        Self {
            parser: IntakeParserKind::Structured.as_str().to_string(),
        }
    }
}

impl FileIntakeConfig {
    /// Unknown names fall back to the structured parser with a warning
    pub fn parse_parser(&self) -> (IntakeParserKind, Vec<ConfigIssue>) {
        match self.parser.trim().to_lowercase().as_str() {
            "structured" | "" => (IntakeParserKind::Structured, vec![]),
            "llm" | "ollama" => (IntakeParserKind::Llm, vec![]),
            other => (
                IntakeParserKind::Structured,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownIntakeParser,
                    format!(
                        "intake.parser: unknown value '{}', falling back to 'structured'",
                        other
                    ),
                )],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parser() {
        let config = FileIntakeConfig {
            parser: "LLM".into(),
        };
        assert_eq!(config.parse_parser().0, IntakeParserKind::Llm);

        let config = FileIntakeConfig {
            parser: "regex".into(),
        };
        let (kind, issues) = config.parse_parser();
        assert_eq!(kind, IntakeParserKind::Structured);
        assert_eq!(issues[0].code, ConfigIssueCode::UnknownIntakeParser);
    }
}
