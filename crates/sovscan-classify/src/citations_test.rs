use super::*;

#[test]
fn extracts_urls_from_text() {
    let text = "See https://example.com/reviews and http://acme.test/about for more.";
    let citations = extract_citations(text, &[]);
    assert_eq!(
        citations,
        vec![
            "https://example.com/reviews".to_string(),
            "http://acme.test/about".to_string(),
        ]
    );
}

#[test]
fn trailing_punctuation_is_trimmed() {
    let citations = extract_citations("Read https://example.com/a.", &[]);
    assert_eq!(citations, vec!["https://example.com/a".to_string()]);
}

#[test]
fn structured_citations_come_first_and_dedupe() {
    let structured = vec!["https://example.com/a".to_string()];
    let text = "Sources: https://example.com/a and https://example.com/b";
    let citations = extract_citations(text, &structured);
    assert_eq!(
        citations,
        vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ]
    );
}

#[test]
fn no_urls_yields_empty_vec() {
    assert!(extract_citations("no links here", &[]).is_empty());
}
