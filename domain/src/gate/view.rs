//! Expansion views and the user requests that select them

use serde::{Deserialize, Serialize};

/// What the output gate is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Snapshot,
    /// A: peri-operative medication stoplight table
    Table,
    /// B: specialist rationale
    Rationale,
    /// C: guideline citations
    Citations,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Snapshot => "snapshot",
            View::Table => "table",
            View::Rationale => "rationale",
            View::Citations => "citations",
        }
    }

    pub fn is_detail(&self) -> bool {
        !matches!(self, View::Snapshot)
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gate input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRequest {
    Snapshot,
    A,
    B,
    C,
    Back,
}

impl ViewRequest {
    /// Recognize a view request; anything else belongs to intake
    pub fn parse(input: &str) -> Option<ViewRequest> {
        let normalized = input
            .trim()
            .trim_end_matches([')', '.'])
            .trim()
            .to_lowercase();
        match normalized.as_str() {
            "snapshot" | "home" => Some(ViewRequest::Snapshot),
            "a" | "table" => Some(ViewRequest::A),
            "b" | "rationale" => Some(ViewRequest::B),
            "c" | "citations" | "references" => Some(ViewRequest::C),
            "back" => Some(ViewRequest::Back),
            _ => None,
        }
    }

    pub fn target(&self) -> View {
        match self {
            ViewRequest::Snapshot | ViewRequest::Back => View::Snapshot,
            ViewRequest::A => View::Table,
            ViewRequest::B => View::Rationale,
            ViewRequest::C => View::Citations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests() {
        assert_eq!(ViewRequest::parse("A"), Some(ViewRequest::A));
        assert_eq!(ViewRequest::parse(" b) "), Some(ViewRequest::B));
        assert_eq!(ViewRequest::parse("Citations"), Some(ViewRequest::C));
        assert_eq!(ViewRequest::parse("BACK"), Some(ViewRequest::Back));
        assert_eq!(ViewRequest::parse("a new patient with CKD"), None);
        assert_eq!(ViewRequest::parse("1"), None);
    }

    #[test]
    fn test_back_returns_home() {
        assert_eq!(ViewRequest::Back.target(), View::Snapshot);
        assert_eq!(ViewRequest::A.target(), View::Table);
        assert!(View::Table.is_detail());
    }
}
