//! Paste-mode intake parsers that need no model call

mod structured_parser;

pub use structured_parser::StructuredCaseParser;
