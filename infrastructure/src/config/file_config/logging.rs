//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily rolling tracing logs and transcripts;
    /// unset keeps tracing on stderr and transcripts in the data dir
    pub dir: Option<String>,
    /// Write the JSONL conversation transcript
    pub conversation_log: bool,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            conversation_log: true,
        }
    }
}

impl FileLoggingConfig {
    /// Directory transcripts are written to, expanding a leading `~`
    pub fn transcript_dir(&self) -> Option<PathBuf> {
        match &self.dir {
            Some(dir) => Some(expand_home(dir)),
            None => dirs::data_dir().map(|d| d.join("ckm-board").join("logs")),
        }
    }

    pub fn tracing_dir(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_is_used_for_both() {
        let config = FileLoggingConfig {
            dir: Some("/var/log/ckm".into()),
            conversation_log: true,
        };
        assert_eq!(config.tracing_dir(), Some(PathBuf::from("/var/log/ckm")));
        assert_eq!(config.transcript_dir(), Some(PathBuf::from("/var/log/ckm")));
    }

    #[test]
    fn test_no_dir_keeps_tracing_on_stderr() {
        let config = FileLoggingConfig::default();
        assert!(config.tracing_dir().is_none());
        assert!(config.conversation_log);
    }
}
