//! Snapshot validation and best-effort length fitting

use super::parsing::ParsedSnapshot;
use super::snapshot::{Snapshot, SnapshotSection};
use crate::core::string::{truncate_words, word_count};
use serde::{Deserialize, Serialize};

/// Problem found in one synthesis attempt; fed back to the provider on retry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingSection { section: SnapshotSection },
    OverWordLimit { words: usize, limit: usize },
    ProviderFailure { message: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingSection { section } => write!(
                f,
                "Section {}) {} is missing",
                section.letter(),
                section.title()
            ),
            ValidationIssue::OverWordLimit { words, limit } => {
                write!(f, "Snapshot has {} words; the limit is {}", words, limit)
            }
            ValidationIssue::ProviderFailure { message } => {
                write!(f, "Previous attempt failed: {}", message)
            }
        }
    }
}

pub fn validate(parsed: &ParsedSnapshot, word_limit: usize) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = parsed
        .missing
        .iter()
        .map(|section| ValidationIssue::MissingSection { section: *section })
        .collect();
    let words = parsed.snapshot.word_count();
    if words > word_limit {
        issues.push(ValidationIssue::OverWordLimit {
            words,
            limit: word_limit,
        });
    }
    issues
}

const MIN_RATIONALE_WORDS: usize = 12;
const MIN_PROBLEM_WORDS: usize = 20;

/// Trim list tails, then item text, until the rendered Snapshot fits
/// `word_limit`.
///
/// Facts listed in `protected` (missing-data flags) are never removed or
/// shortened. At least one next step is kept. Returns whether anything was cut.
pub fn fit_to_limit(snapshot: &mut Snapshot, word_limit: usize, protected: &[String]) -> bool {
    let over = |s: &Snapshot| s.word_count() > word_limit;
    let mut changed = false;

    while over(snapshot) && snapshot.risks.len() > 1 {
        snapshot.risks.pop();
        changed = true;
    }
    while over(snapshot) {
        let Some(idx) = snapshot
            .facts
            .iter()
            .rposition(|f| !protected.contains(&f.text))
        else {
            break;
        };
        snapshot.facts.remove(idx);
        changed = true;
    }
    while over(snapshot) && snapshot.next_steps.len() > 1 {
        snapshot.next_steps.pop();
        changed = true;
    }
    if over(snapshot) {
        snapshot.decision.rationale =
            truncate_words(&snapshot.decision.rationale, MIN_RATIONALE_WORDS);
        snapshot.problem = truncate_words(&snapshot.problem, MIN_PROBLEM_WORDS);
        changed = true;
    }
    if over(snapshot) {
        changed |= shorten_items(snapshot, word_limit, protected);
    }
    if over(snapshot) && !snapshot.risks.is_empty() {
        snapshot.risks.clear();
        changed = true;
    }
    changed
}

const MIN_ITEM_WORDS: usize = 3;

/// Cut the text of the remaining next steps and unprotected items, in
/// render order, until the word limit holds or every item is at its floor.
fn shorten_items(snapshot: &mut Snapshot, word_limit: usize, protected: &[String]) -> bool {
    let excess = |s: &Snapshot| s.word_count().saturating_sub(word_limit);
    let mut changed = false;

    for i in 0..snapshot.facts.len() {
        if protected.contains(&snapshot.facts[i].text) {
            continue;
        }
        let over = excess(snapshot);
        changed |= cut_words(&mut snapshot.facts[i].text, over);
    }
    for i in 0..snapshot.risks.len() {
        let over = excess(snapshot);
        changed |= cut_words(&mut snapshot.risks[i].text, over);
    }
    for i in 0..snapshot.next_steps.len() {
        let over = excess(snapshot);
        changed |= cut_words(&mut snapshot.next_steps[i].action, over);
        let over = excess(snapshot);
        changed |= cut_words(&mut snapshot.next_steps[i].owner, over);
        let over = excess(snapshot);
        changed |= cut_words(&mut snapshot.next_steps[i].timing, over);
    }
    changed
}

/// Drop up to `over` trailing words, keeping at least `MIN_ITEM_WORDS`
fn cut_words(text: &mut String, over: usize) -> bool {
    let words = word_count(text);
    if over == 0 || words <= MIN_ITEM_WORDS {
        return false;
    }
    *text = truncate_words(text, words.saturating_sub(over).max(MIN_ITEM_WORDS));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::parsing::parse_snapshot;
    use crate::synthesis::snapshot::{Decision, NextStep, SnapshotItem};

    fn long_snapshot() -> Snapshot {
        let sentence = "word ".repeat(20);
        Snapshot {
            problem: "Pre-op review".into(),
            facts: vec![
                SnapshotItem::new("HF phenotype unclear; EF not provided"),
                SnapshotItem::new(sentence.trim()),
                SnapshotItem::new(sentence.trim()),
            ],
            risks: (0..5).map(|_| SnapshotItem::new(sentence.trim())).collect(),
            decision: Decision {
                needed: true,
                rationale: "holds".into(),
            },
            next_steps: (0..4)
                .map(|_| NextStep::new(sentence.trim(), "Cardiology", "today"))
                .collect(),
            truncated: false,
        }
    }

    #[test]
    fn test_validate_reports_missing_and_length() {
        let parsed = parse_snapshot("A) One-Line Problem: short\n");
        let issues = validate(&parsed, 3);
        assert!(issues.contains(&ValidationIssue::MissingSection {
            section: SnapshotSection::NextSteps
        }));
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, ValidationIssue::OverWordLimit { limit: 3, .. }))
        );
    }

    #[test]
    fn test_fit_keeps_flags_and_one_step() {
        let flags = vec!["HF phenotype unclear; EF not provided".to_string()];
        let mut snap = long_snapshot();
        assert!(snap.word_count() > 60);

        let changed = fit_to_limit(&mut snap, 60, &flags);
        assert!(changed);
        assert!(snap.word_count() <= 60);
        assert!(snap.has_fact(&flags[0]));
        assert_eq!(snap.next_steps.len(), 1);
    }

    #[test]
    fn test_fit_shortens_a_single_long_step() {
        let flags = vec!["HF phenotype unclear; EF not provided".to_string()];
        let mut snap = long_snapshot();
        snap.risks.clear();
        snap.facts.truncate(1);
        snap.next_steps = vec![NextStep::new("word ".repeat(300).trim(), "Cardiology", "today")];

        assert!(fit_to_limit(&mut snap, 40, &flags));
        assert!(snap.word_count() <= 40);
        assert!(snap.has_fact(&flags[0]));
        assert_eq!(snap.next_steps.len(), 1);
        assert!(word_count(&snap.next_steps[0].action) >= MIN_ITEM_WORDS);
    }

    #[test]
    fn test_fit_noop_when_within_limit() {
        let mut snap = long_snapshot();
        assert!(!fit_to_limit(&mut snap, 10_000, &[]));
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::MissingSection {
            section: SnapshotSection::Risks,
        };
        assert_eq!(issue.to_string(), "Section C) Key Risks is missing");
    }
}
