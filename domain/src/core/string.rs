//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Number of whitespace-separated words
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Keep at most `max_words` words of `s`
pub fn truncate_words(s: &str, max_words: usize) -> String {
    s.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip list markers from the start of a line ("- ", "* ", "• ", "1. ", "2) ")
pub fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    // A bullet only counts when followed by whitespace, so "**bold**" survives
    let without_bullet = match trimmed.chars().next() {
        Some(c) if "-*•+".contains(c) => {
            let rest = &trimmed[c.len_utf8()..];
            if rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    };
    if without_bullet.len() == trimmed.len() {
        let digits = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if digits > 0
            && let Some(rest) = trimmed[digits..].strip_prefix(['.', ')'])
        {
            return rest.trim_start();
        }
    }
    without_bullet
}

/// Canonical form used to compare items across specialist payloads.
///
/// Lowercases, removes list markers and emphasis, collapses whitespace and
/// drops trailing punctuation.
pub fn normalize_item(line: &str) -> String {
    let stripped = strip_list_marker(line);
    let cleaned: String = stripped
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ';', ',', ':', '!'])
        .to_lowercase()
}

/// Byte offset of the first whole-word occurrence of `word` in `haystack`.
///
/// Both arguments are expected lowercase. A trailing plural "s" still counts
/// as the same word.
pub fn find_word(haystack: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();
        from = end;

        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let rest = haystack[end..].strip_prefix('s').unwrap_or(&haystack[end..]);
        let after_ok = rest.chars().next().is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
    }
    None
}

pub fn contains_word(haystack: &str, word: &str) -> bool {
    find_word(haystack, word).is_some()
}
