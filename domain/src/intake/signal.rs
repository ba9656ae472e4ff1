//! Recognition of explicit user signals during intake

/// Explicit control signal typed by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeSignal {
    ChooseGuided,
    ChoosePaste,
    /// "Generate synthesis", the commit signal in guided mode
    Generate,
    /// "Confirm", the commit signal in paste mode
    Confirm,
    /// Discard the parsed paste and start over
    Reject,
    /// Keep refining before generating
    AddDetails,
}

impl IntakeSignal {
    /// Parse a whole utterance as a signal.
    ///
    /// Only exact (normalised) matches count, so ordinary answers containing
    /// these words are never mistaken for a commit.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized: String = input
            .trim()
            .trim_matches(|c: char| "*'\"`.!".contains(c))
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "1" | "guided" | "guided intake" => Some(IntakeSignal::ChooseGuided),
            "2" | "paste" | "paste mode" => Some(IntakeSignal::ChoosePaste),
            "generate" | "generate synthesis" | "submit" | "submit case" => {
                Some(IntakeSignal::Generate)
            }
            "confirm" | "confirmed" | "correct" | "looks correct" => Some(IntakeSignal::Confirm),
            "reject" | "cancel" | "start over" | "incorrect" => Some(IntakeSignal::Reject),
            "add details" | "add detail" => Some(IntakeSignal::AddDetails),
            _ => None,
        }
    }

    /// Whether this signal commits the case
    pub fn is_commit(&self) -> bool {
        matches!(self, IntakeSignal::Generate | IntakeSignal::Confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_choice() {
        assert_eq!(IntakeSignal::parse("1"), Some(IntakeSignal::ChooseGuided));
        assert_eq!(IntakeSignal::parse(" Paste Mode "), Some(IntakeSignal::ChoosePaste));
    }

    #[test]
    fn test_commit_signals() {
        assert_eq!(
            IntakeSignal::parse("'Generate synthesis'"),
            Some(IntakeSignal::Generate)
        );
        assert_eq!(IntakeSignal::parse("**Confirm**"), Some(IntakeSignal::Confirm));
        assert!(IntakeSignal::Generate.is_commit());
        assert!(!IntakeSignal::AddDetails.is_commit());
    }

    #[test]
    fn test_ordinary_text_is_not_a_signal() {
        assert_eq!(IntakeSignal::parse("please confirm the EF"), None);
        assert_eq!(IntakeSignal::parse("metformin, empagliflozin"), None);
    }
}
