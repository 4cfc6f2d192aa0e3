//! Brand-mention detection and sentence-position estimation.

/// Returns `true` if any of `terms` occurs in `text`, case-insensitively.
///
/// Matching is substring-based: brand names are frequently embedded in
/// possessives and compounds ("Acme's", "Acme-branded"), so word-boundary
/// matching would undercount.
#[must_use]
pub fn detect_mention(text: &str, terms: &[&str]) -> bool {
    let haystack = text.to_lowercase();
    terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .any(|t| haystack.contains(&t.to_lowercase()))
}

/// 1-based ordinal of the first sentence in which any of `terms` occurs.
///
/// Sentences are split at `.`, `!` and `?`. Returns `None` when no sentence
/// matches (callers should only invoke this after a positive
/// [`detect_mention`], but a `None` is still safe).
#[must_use]
pub fn mention_position(text: &str, terms: &[&str]) -> Option<i32> {
    let lowered: Vec<String> = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_lowercase())
        .collect();

    let mut ordinal = 0i32;
    for sentence in text.split(['.', '!', '?']) {
        if sentence.trim().is_empty() {
            continue;
        }
        ordinal += 1;
        let haystack = sentence.to_lowercase();
        if lowered.iter().any(|t| haystack.contains(t)) {
            return Some(ordinal);
        }
    }
    None
}

/// Count non-overlapping case-insensitive occurrences of `term` in `text`.
#[must_use]
pub fn count_occurrences(text: &str, term: &str) -> u32 {
    let term = term.to_lowercase();
    if term.trim().is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();
    let mut count = 0u32;
    let mut from = 0usize;
    while let Some(pos) = haystack[from..].find(&term) {
        count += 1;
        from += pos + term.len();
    }
    count
}

#[cfg(test)]
#[path = "mention_test.rs"]
mod tests;
