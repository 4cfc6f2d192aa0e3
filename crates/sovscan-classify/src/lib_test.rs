use std::collections::BTreeMap;

use sovscan_core::{Provider, ProviderSettings, Sentiment, SettingsSnapshot};

use super::*;

fn snapshot() -> SettingsSnapshot {
    let mut providers = BTreeMap::new();
    providers.insert(
        Provider::OpenAi,
        ProviderSettings {
            model: "gpt-test".to_string(),
            iterations: 1,
            credit_cost: 1,
        },
    );
    SettingsSnapshot {
        brand_name: "Acme Cola".to_string(),
        brand_keywords: vec!["acme fizz".to_string()],
        competitors: vec!["Brand X".to_string()],
        providers,
        timeout_secs: 30,
        temperature: 0.7,
        max_tokens: 512,
    }
}

#[test]
fn classifies_a_mentioning_answer() {
    let text = "Several colas compete. Acme Cola is the best choice; Brand X trails. \
                Details at https://example.com/colas.";
    let classification = classify_response(text, &[], &snapshot());

    assert!(classification.brand_mentioned);
    assert_eq!(classification.mention_position, Some(2));
    assert_eq!(classification.sentiment, Sentiment::Positive);
    assert_eq!(classification.competitor_mentions.get("Brand X"), Some(&1));
    assert_eq!(
        classification.citations,
        vec!["https://example.com/colas".to_string()]
    );
}

#[test]
fn keyword_alias_counts_as_brand_mention() {
    let classification = classify_response("Try Acme Fizz.", &[], &snapshot());
    assert!(classification.brand_mentioned);
    assert_eq!(classification.mention_position, Some(1));
}

#[test]
fn non_mentioning_answer_has_no_position() {
    let classification = classify_response("Brand X dominates the market.", &[], &snapshot());
    assert!(!classification.brand_mentioned);
    assert_eq!(classification.mention_position, None);
    assert_eq!(classification.competitor_mentions.get("Brand X"), Some(&1));
}

#[test]
fn structured_citations_are_preserved() {
    let structured = vec!["https://provider.example/cite1".to_string()];
    let classification = classify_response("Acme Cola is fine.", &structured, &snapshot());
    assert_eq!(classification.citations, structured);
}
