//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How consultation output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Formatted console text
    Text,
    /// One JSON document per view
    Json,
}

impl From<ckm_domain::OutputFormat> for OutputFormat {
    fn from(format: ckm_domain::OutputFormat) -> Self {
        match format {
            ckm_domain::OutputFormat::Text => OutputFormat::Text,
            ckm_domain::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for ckm-board
#[derive(Parser, Debug)]
#[command(name = "ckm-board")]
#[command(author, version, about = "CKM consultation board - cardiology, nephrology and endocrinology in one Snapshot")]
#[command(long_about = r#"
ckm-board collects a case, asks each specialist role for an assessment in
parallel, and merges the answers into a short Consultation Snapshot.

The flow has three stages:
1. Intake: guided questions (at most five per turn) or a pasted case
2. Assessment: every role reviews the same finalized case concurrently
3. Synthesis: one Snapshot, with A/B/C detail views served from cache

Configuration files are loaded from (in priority order):
1. CKM_* environment variables
2. --config <path>          Explicit config file
3. ./ckm-board.toml         Project-level config
4. ~/.config/ckm-board/config.toml   Global config

Example:
  ckm-board
  ckm-board --paste case.txt
  ckm-board --paste case.json --output json
"#)]
pub struct Cli {
    /// Run one paste-mode consultation from a file ("-" reads stdin) and exit
    #[arg(long, value_name = "FILE")]
    pub paste: Option<PathBuf>,

    /// Output format (default: the config file's, else text)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
