//! Infrastructure layer for ckm-board
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod intake;
pub mod logging;
pub mod ollama;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLoggingConfig, FileOutputConfig,
    FileReplConfig, IntakeParserKind,
};
pub use intake::StructuredCaseParser;
pub use logging::JsonlConversationLogger;
pub use ollama::OllamaClient;
