//! Intake vocabulary: states, guided question batches, prompts and signals.
//!
//! The turn-by-turn driver lives in the application layer
//! (`IntakeSession`) because paste mode calls out to the parser port.

pub mod questions;
pub mod signal;
pub mod state;
