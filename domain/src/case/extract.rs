//! Lightweight extraction of structured values from free-text answers.
//!
//! Pure text scanning, no I/O. Used by guided intake to recognise the
//! critical measurements in an essentials answer and by the structured
//! paste parser.

use super::field::CaseField;

/// Aliases recognised in front of a measurement value
fn measurement_aliases(field: CaseField) -> &'static [&'static str] {
    match field {
        CaseField::EjectionFraction => &["ejection fraction", "lvef", "ef"],
        CaseField::Egfr => &["egfr", "gfr"],
        CaseField::Hba1c => &["hba1c", "a1c"],
        _ => &[],
    }
}

/// Filler words allowed between an alias and its number (e.g. "EF of 35")
const FILLERS: &[&str] = &["of", "is", "was", "at", "approx", "approximately", "about"];

/// Extract the measurement for `field` from free text.
///
/// Returns `None` when the alias is absent or is not followed by a number
/// (e.g. "EF unknown", "no recent HbA1c").
///
/// ```
/// use ckm_domain::case::extract::extract_measurement;
/// use ckm_domain::CaseField;
///
/// assert_eq!(extract_measurement("LVEF 35%, NYHA II", CaseField::EjectionFraction), Some(35.0));
/// assert_eq!(extract_measurement("eGFR: 45 mL/min", CaseField::Egfr), Some(45.0));
/// assert_eq!(extract_measurement("EF unknown", CaseField::EjectionFraction), None);
/// ```
pub fn extract_measurement(text: &str, field: CaseField) -> Option<f64> {
    let lower = text.to_lowercase();
    for alias in measurement_aliases(field) {
        let mut search_from = 0;
        while let Some(pos) = lower[search_from..].find(alias) {
            let start = search_from + pos;
            let end = start + alias.len();
            search_from = end;

            let before_ok = lower[..start]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
            let after_ok = lower[end..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric());
            if !before_ok || !after_ok {
                continue;
            }

            if let Some(value) = number_after(&lower[end..]) {
                return Some(value);
            }
        }
    }
    None
}

/// Parse the first number following an alias, skipping separators and fillers
fn number_after(rest: &str) -> Option<f64> {
    let mut rest = rest;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || ":=~-(".contains(c));
        let word_end = rest
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(rest.len());
        if word_end > 0 && FILLERS.contains(&&rest[..word_end]) {
            rest = &rest[word_end..];
            continue;
        }
        break;
    }

    let num_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let candidate = rest[..num_end].trim_end_matches('.');
    if candidate.is_empty() {
        return None;
    }
    candidate.parse().ok()
}

/// Interpret a yes/no answer
pub fn parse_yes_no(text: &str) -> Option<bool> {
    let first = text
        .split(|c: char| c.is_whitespace() || ",.;:!".contains(c))
        .find(|w| !w.is_empty())?
        .to_lowercase();
    match first.as_str() {
        "yes" | "y" | "true" | "yep" | "periop" => Some(true),
        "no" | "n" | "false" | "nope" | "not" => Some(false),
        _ => None,
    }
}

/// Split one batch answer into per-question answers (one per line or `;`)
pub fn split_answers(text: &str) -> Vec<String> {
    text.split(['\n', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Split a medication answer into items; "none" yields an empty list
pub fn split_list(text: &str) -> Vec<String> {
    let items: Vec<String> = text
        .split([',', '\n', ';'])
        .map(|s| s.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if items.len() == 1 {
        let only = items[0].to_lowercase();
        if matches!(only.as_str(), "none" | "nil" | "no medications" | "n/a") {
            return Vec::new();
        }
    }
    items
}
