use super::*;

#[test]
fn detects_case_insensitive_substring() {
    assert!(detect_mention("I'd suggest ACME Cola for that.", &["Acme Cola"]));
    assert!(detect_mention("Acme's lineup is solid.", &["acme"]));
    assert!(!detect_mention("Try Brand X instead.", &["Acme Cola"]));
}

#[test]
fn any_keyword_counts_as_a_mention() {
    let terms = ["Acme Cola", "acme fizz"];
    assert!(detect_mention("The Acme Fizz line is popular.", &terms));
}

#[test]
fn empty_terms_never_match() {
    assert!(!detect_mention("anything at all", &[]));
    assert!(!detect_mention("anything at all", &["", "  "]));
}

#[test]
fn position_is_one_based_sentence_ordinal() {
    let text = "There are many colas. Brand X is common. Acme Cola is a standout.";
    assert_eq!(mention_position(text, &["acme cola"]), Some(3));
    assert_eq!(mention_position(text, &["brand x"]), Some(2));
    assert_eq!(mention_position(text, &["nope"]), None);
}

#[test]
fn position_skips_empty_sentence_fragments() {
    // "..." produces empty splits that must not advance the ordinal.
    let text = "Well... Acme Cola wins.";
    assert_eq!(mention_position(text, &["acme cola"]), Some(2));
}

#[test]
fn occurrences_are_counted_without_overlap() {
    assert_eq!(count_occurrences("Acme, acme, ACME", "acme"), 3);
    assert_eq!(count_occurrences("aaaa", "aa"), 2);
    assert_eq!(count_occurrences("no match here", "acme"), 0);
    assert_eq!(count_occurrences("text", ""), 0);
}
