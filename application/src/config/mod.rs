//! Application-level configuration.
//!
//! - [`BoardConfig`] - roles, timeouts, Snapshot limits and synthesis policy tables

pub mod board_config;

pub use board_config::{BoardConfig, DEFAULT_ROLE_TIMEOUT};
