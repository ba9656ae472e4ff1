//! Parsing of provider text into a typed [`Snapshot`].
//!
//! Providers are asked for the A–E template but formatting drifts: headers
//! come as `A)`, `**A) Key Facts**`, `### Key Facts` or plain keywords, and
//! next steps use any dash. The parser accepts all of these and reports the
//! sections it could not find.

use super::snapshot::{Decision, MAX_FACTS, MAX_RISKS, NextStep, Snapshot, SnapshotItem, SnapshotSection};
use crate::assessment::role::Role;
use crate::core::string::strip_list_marker;

/// Result of parsing one provider response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSnapshot {
    pub snapshot: Snapshot,
    /// Sections whose header (or required content) was absent
    pub missing: Vec<SnapshotSection>,
}

/// Remove emphasis and heading markup around a line
fn strip_markup(line: &str) -> &str {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim_matches('_')
        .trim()
}

fn keyword_section(lower: &str) -> Option<SnapshotSection> {
    const KEYWORDS: [(&str, SnapshotSection); 7] = [
        ("one-line problem", SnapshotSection::Problem),
        ("problem", SnapshotSection::Problem),
        ("key facts", SnapshotSection::Facts),
        ("key risks", SnapshotSection::Risks),
        ("decisions needed", SnapshotSection::Decision),
        ("decision needed", SnapshotSection::Decision),
        ("next steps", SnapshotSection::NextSteps),
    ];
    KEYWORDS
        .iter()
        .find(|(kw, _)| lower.starts_with(kw))
        .map(|(_, section)| *section)
}

/// Detect a section header; returns the section and any inline content
/// following the header's colon.
fn parse_header(line: &str) -> Option<(SnapshotSection, String)> {
    let text = strip_markup(line);
    let mut chars = text.chars();
    let first = chars.next()?;
    let second = chars.next();

    let (section, rest) = if matches!(second, Some(')')) {
        let section = SnapshotSection::from_letter(first)?;
        (section, text[2..].trim())
    } else {
        let section = keyword_section(&text.to_lowercase())?;
        (section, text)
    };

    // Content after "Title:" stays with the header line
    let inline = match rest.find(':') {
        Some(idx) => rest[idx + 1..].trim().trim_start_matches('*').trim(),
        None if rest.eq_ignore_ascii_case(section.title()) || rest.is_empty() => "",
        None => {
            // "A) Problem text" without a title
            if keyword_section(&rest.to_lowercase()).is_some() {
                ""
            } else {
                rest
            }
        }
    };
    Some((section, inline.to_string()))
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.chars().all(|c| matches!(c, '-' | '=' | '_' | '*'))
}

/// Clean a list line: strip marker, emphasis and a trailing `(agreed: …)`
fn clean_item(line: &str) -> (String, Vec<Role>) {
    let text: String = strip_list_marker(line)
        .chars()
        .filter(|c| *c != '*')
        .collect();
    let text = text.trim();
    split_agreement(text)
}

fn split_agreement(text: &str) -> (String, Vec<Role>) {
    if text.ends_with(')')
        && let Some(idx) = text.rfind("(agreed").or_else(|| text.rfind("(Agreed"))
    {
        let inner = &text[idx + 1..text.len() - 1];
        let names = inner.split_once(':').map(|(_, r)| r).unwrap_or("");
        let roles: Vec<Role> = names
            .split([',', '/'])
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .filter_map(|n| n.parse().ok())
            .collect();
        return (text[..idx].trim_end().to_string(), roles);
    }
    (text.to_string(), Vec::new())
}

const STEP_SEPARATORS: [&str; 3] = [" — ", " – ", " - "];

/// Parse `Action — Owner (Timing)`; missing parts are left empty
pub fn parse_next_step(line: &str) -> NextStep {
    let (text, agreed_by) = clean_item(line);

    let (head, timing) = match (text.rfind('('), text.ends_with(')')) {
        (Some(open), true) => (
            text[..open].trim_end().to_string(),
            text[open + 1..text.len() - 1].trim().to_string(),
        ),
        _ => (text.clone(), String::new()),
    };

    let split = STEP_SEPARATORS
        .iter()
        .filter_map(|sep| head.find(sep).map(|idx| (idx, sep.len())))
        .min_by_key(|(idx, _)| *idx);

    let (action, owner) = match split {
        Some((idx, len)) => (
            head[..idx].trim().to_string(),
            head[idx + len..].trim().to_string(),
        ),
        None => (head.trim().to_string(), String::new()),
    };

    NextStep {
        action,
        owner,
        timing,
        agreed_by,
    }
}

/// Parse the decision line: leading yes/no plus rationale
pub fn parse_decision(text: &str) -> Decision {
    let cleaned: String = text.chars().filter(|c| *c != '*').collect();
    let trimmed = cleaned.trim();
    let lower = trimmed.to_lowercase();

    let (needed, rest) = if lower.starts_with("yes") {
        (true, &trimmed[3..])
    } else if lower.starts_with("no") && !lower.starts_with("not") {
        (false, &trimmed[2..])
    } else {
        (lower.contains("yes"), trimmed)
    };

    let rationale = rest
        .trim_start_matches(|c: char| c.is_whitespace() || "—–-:,.;".contains(c))
        .trim()
        .to_string();
    Decision { needed, rationale }
}

/// Parse provider text into a Snapshot, reporting absent sections.
///
/// Facts and risks beyond five are dropped here; length fitting happens later.
pub fn parse_snapshot(text: &str) -> ParsedSnapshot {
    let mut problem = String::new();
    let mut facts = Vec::new();
    let mut risks = Vec::new();
    let mut decision_text = String::new();
    let mut next_steps = Vec::new();

    let mut seen: Vec<SnapshotSection> = Vec::new();
    let mut current: Option<SnapshotSection> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if is_rule(line) {
            current = None;
            continue;
        }
        if let Some((section, inline)) = parse_header(line) {
            if !seen.contains(&section) {
                seen.push(section);
            }
            current = Some(section);
            match section {
                SnapshotSection::Problem if !inline.is_empty() => problem = inline,
                SnapshotSection::Decision if !inline.is_empty() => decision_text = inline,
                _ => {}
            }
            continue;
        }

        match current {
            Some(SnapshotSection::Problem) => {
                if problem.is_empty() {
                    problem = clean_item(line).0;
                }
            }
            Some(SnapshotSection::Facts) => {
                let (text, agreed_by) = clean_item(line);
                facts.push(SnapshotItem { text, agreed_by });
            }
            Some(SnapshotSection::Risks) => {
                let (text, agreed_by) = clean_item(line);
                risks.push(SnapshotItem { text, agreed_by });
            }
            Some(SnapshotSection::Decision) => {
                let (text, _) = clean_item(line);
                if decision_text.is_empty() {
                    decision_text = text;
                } else {
                    decision_text.push(' ');
                    decision_text.push_str(&text);
                }
            }
            Some(SnapshotSection::NextSteps) => {
                let step = parse_next_step(line);
                if !step.action.is_empty() {
                    next_steps.push(step);
                }
            }
            None => {}
        }
    }

    facts.retain(|f: &SnapshotItem| !f.text.is_empty());
    risks.retain(|r: &SnapshotItem| !r.text.is_empty());
    facts.truncate(MAX_FACTS);
    risks.truncate(MAX_RISKS);

    let missing = SnapshotSection::ALL
        .into_iter()
        .filter(|section| {
            !seen.contains(section)
                || (*section == SnapshotSection::Problem && problem.is_empty())
                || (*section == SnapshotSection::Decision && decision_text.is_empty())
        })
        .collect();

    ParsedSnapshot {
        snapshot: Snapshot {
            problem,
            facts,
            risks,
            decision: parse_decision(&decision_text),
            next_steps,
            truncated: false,
        },
        missing,
    }
}
