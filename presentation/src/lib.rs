//! Presentation layer for ckm-board
//!
//! This crate contains CLI definitions, output formatters,
//! progress reporters, and the interactive consultation REPL.

pub mod chat;
pub mod cli;
pub mod config;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::ConsultRepl;
pub use cli::commands::{Cli, OutputFormat};
pub use config::{OutputConfig, ReplConfig};
pub use output::console::ConsoleFormatter;
pub use output::formatter::{JsonFormatter, OutputFormatter};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
