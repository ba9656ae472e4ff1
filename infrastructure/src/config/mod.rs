//! Configuration file loading for ckm-board
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CKM_` environment variables (`CKM_SYNTHESIS__WORD_LIMIT=200`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./ckm-board.toml` or `./.ckm-board.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/ckm-board/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBoardConfig, FileConfig, FileIntakeConfig, FileLoggingConfig,
    FileOllamaConfig, FileOutputConfig, FileOverrideConfig, FileProvidersConfig, FileReplConfig,
    FileRoleConfig, FileSynthesisConfig, IntakeParserKind,
};
pub use loader::ConfigLoader;
