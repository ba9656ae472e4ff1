//! Case model: the structured record assembled during intake.
//!
//! - [`field::CaseField`] / [`field::FieldValue`] - field catalogue and values
//! - [`entities::Case`] - mutable draft record
//! - [`entities::FinalCase`] - immutable handle produced by finalization
//! - [`entities::CaseDiff`] - assignments produced by one intake turn
//! - [`extract`] - measurement and answer extraction from free text

pub mod entities;
pub mod extract;
pub mod field;
