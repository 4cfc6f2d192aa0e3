//! Citation URL extraction.

use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"')\]]+"#).expect("valid regex"));

/// Merge provider-structured citations with URLs found in the answer text.
///
/// Structured citations come first, then text URLs in order of appearance;
/// duplicates are dropped. Trailing punctuation that sentence context glues
/// onto a URL (`.`, `,`, `)`, …) is trimmed before comparison.
#[must_use]
pub fn extract_citations(text: &str, structured: &[String]) -> Vec<String> {
    let mut citations: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let url = raw.trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !url.is_empty() && !citations.iter().any(|c| c == url) {
            citations.push(url.to_string());
        }
    };

    for url in structured {
        push(url);
    }
    for m in URL_PATTERN.find_iter(text) {
        push(m.as_str());
    }

    citations
}

#[cfg(test)]
#[path = "citations_test.rs"]
mod tests;
