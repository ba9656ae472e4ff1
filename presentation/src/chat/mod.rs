//! Interactive consultation module
//!
//! Provides a readline-based interface for running consultations turn by turn.

mod repl;

pub use repl::ConsultRepl;
