//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod consultation;
pub mod intake;
pub mod output_gate;
pub mod run_assessment;
pub mod synthesize;
