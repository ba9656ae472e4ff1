//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`string`] - text helpers (truncation, word counting, item normalisation)

pub mod error;
pub mod string;
