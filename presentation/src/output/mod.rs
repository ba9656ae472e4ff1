//! Output formatting for consultation turns

pub mod console;
pub mod formatter;
