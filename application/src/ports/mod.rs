//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod assessment_provider;
pub mod conversation_logger;
pub mod intake_parser;
pub mod progress;
pub mod synthesis_provider;
