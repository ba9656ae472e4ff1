//! Presentation-level configuration
//!
//! Configuration for output formatting and REPL behavior, resolved from the
//! file config and CLI flags by the binary.

use crate::cli::commands::OutputFormat;
use std::path::PathBuf;

/// Output configuration for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

/// REPL configuration for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    /// Show progress indicators
    pub show_progress: bool,
    /// Path to history file; `None` disables history
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            history_file: dirs::data_dir().map(|d| d.join("ckm-board").join("history.txt")),
        }
    }
}

impl ReplConfig {
    /// Apply a configured history path, expanding a leading `~`
    pub fn with_history_file(mut self, path: Option<&str>) -> Self {
        if let Some(path) = path {
            self.history_file = Some(match path.strip_prefix("~/") {
                Some(rest) => dirs::home_dir()
                    .map(|home| home.join(rest))
                    .unwrap_or_else(|| PathBuf::from(path)),
                None => PathBuf::from(path),
            });
        }
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_override() {
        let config = ReplConfig::default().with_history_file(Some("/tmp/ckm-history"));
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/ckm-history")));
        let config = ReplConfig::default().with_history_file(None);
        assert!(config.history_file.is_some() || dirs::data_dir().is_none());
    }
}
