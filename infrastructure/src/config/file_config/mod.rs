//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; domain values are parsed and validated
//! afterwards so that every problem can be reported at once.

mod board;
mod intake;
mod logging;
mod output;
mod providers;
mod repl;
mod synthesis;

pub use board::{FileBoardConfig, FileRoleConfig};
pub use intake::{FileIntakeConfig, IntakeParserKind};
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use providers::{FileOllamaConfig, FileProvidersConfig};
pub use repl::FileReplConfig;
pub use synthesis::{FileOverrideConfig, FileSynthesisConfig};

use ckm_application::BoardConfig;
use ckm_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration that cannot be turned into a runnable board
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("invalid configuration:\n{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Specialist roles and fan-out timeout
    pub board: FileBoardConfig,
    /// Snapshot limits and policy tables
    pub synthesis: FileSynthesisConfig,
    pub intake: FileIntakeConfig,
    /// Model server settings
    pub providers: FileProvidersConfig,
    pub output: FileOutputConfig,
    pub repl: FileReplConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.board.parse_roles().1);
        issues.extend(self.board.timeout_issues());
        issues.extend(self.synthesis.limit_issues());
        issues.extend(self.synthesis.parse_critical_fields().1);
        issues.extend(self.synthesis.parse_overrides().1);
        issues.extend(self.intake.parse_parser().1);
        issues
    }

    /// Build the runtime board configuration; any error-severity issue fails
    pub fn to_board_config(&self) -> Result<BoardConfig, ConfigValidationError> {
        let errors: Vec<ConfigIssue> = self
            .validate()
            .into_iter()
            .filter(ConfigIssue::is_error)
            .collect();
        if !errors.is_empty() {
            return Err(ConfigValidationError::Invalid(errors));
        }

        Ok(BoardConfig::default()
            .with_roles(self.board.parse_roles().0)
            .with_role_timeout(Duration::from_secs(self.board.role_timeout_secs))
            .with_word_limit(self.synthesis.word_limit)
            .with_max_retries(self.synthesis.max_retries)
            .with_critical_fields(self.synthesis.parse_critical_fields().0)
            .with_safety_overrides(self.synthesis.parse_overrides().0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckm_domain::{ConfigIssueCode, MedicationClass, OutputFormat, Role};

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[board]
role_timeout_secs = 45

[[board.roles]]
id = "cardiology"
priority = 1
citations = ["ESC 2023 Heart Failure Guidelines"]

[[board.roles]]
id = "nephrology"
priority = 2

[synthesis]
word_limit = 200
max_retries = 2
critical_fields = ["ejection_fraction", "egfr"]

[[synthesis.safety_overrides]]
item = "metformin"
condition = "egfr_below:30"
action = "hold"
note = "Contraindicated when eGFR < 30"

[intake]
parser = "llm"

[providers.ollama]
model = "llama3.1:8b"

[output]
format = "json"

[logging]
conversation_log = false
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());

        let board = config.to_board_config().unwrap();
        assert_eq!(board.roles.len(), 2);
        assert_eq!(board.roles[1].role, Role::Nephrology);
        assert_eq!(board.role_timeout, Duration::from_secs(45));
        assert_eq!(board.word_limit, 200);
        assert_eq!(board.max_attempts(), 3);
        assert_eq!(board.critical_fields.len(), 2);
        assert_eq!(board.safety_overrides.len(), 1);
        assert_eq!(board.safety_overrides[0].item, MedicationClass::Metformin);

        assert_eq!(config.intake.parse_parser().0, IntakeParserKind::Llm);
        assert_eq!(config.providers.ollama.model, "llama3.1:8b");
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(!config.logging.conversation_log);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[synthesis]
word_limit = 180
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.synthesis.word_limit, 180);
        // Defaults should apply
        assert_eq!(config.board, FileBoardConfig::default());
        assert_eq!(config.synthesis.critical_fields.len(), 3);
        assert!(config.output.color);
        assert!(config.repl.show_progress);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        let board = config.to_board_config().unwrap();
        let defaults = BoardConfig::default();
        assert_eq!(board.roles, defaults.roles);
        assert_eq!(board.word_limit, defaults.word_limit);
        assert_eq!(board.safety_overrides, defaults.safety_overrides);
    }

    #[test]
    fn test_validate_collects_every_issue() {
        let mut config = FileConfig::default();
        config.synthesis.word_limit = 0;
        config.board.role_timeout_secs = 0;
        config.synthesis.critical_fields.push("potassium".into());
        config.board.roles.push(FileRoleConfig {
            id: "cardiology".into(),
            priority: 9,
            citations: None,
        });

        let codes: Vec<ConfigIssueCode> = config.validate().iter().map(|i| i.code).collect();
        assert!(codes.contains(&ConfigIssueCode::DuplicateRole));
        assert!(codes.contains(&ConfigIssueCode::ZeroTimeout));
        assert!(codes.contains(&ConfigIssueCode::ZeroWordLimit));
        assert!(codes.contains(&ConfigIssueCode::UnknownCriticalField));

        let err = config.to_board_config().unwrap_err();
        let ConfigValidationError::Invalid(issues) = &err;
        assert_eq!(issues.len(), 4);
        assert!(err.to_string().contains("word_limit"));
    }

    #[test]
    fn test_warnings_do_not_block_board_config() {
        let mut config = FileConfig::default();
        config.intake.parser = "regex".into();
        assert_eq!(config.validate().len(), 1);
        assert!(config.to_board_config().is_ok());
    }
}
