use std::collections::BTreeMap;

use crate::scan::Provider;
use crate::ConfigError;

use super::*;

fn provider_settings(iterations: u32, credit_cost: i64) -> ProviderSettings {
    ProviderSettings {
        model: "test-model".to_string(),
        iterations,
        credit_cost,
    }
}

fn valid_definition() -> ScanDefinition {
    let mut providers = BTreeMap::new();
    providers.insert(Provider::OpenAi, provider_settings(10, 1));
    providers.insert(Provider::Anthropic, provider_settings(5, 2));
    ScanDefinition {
        name: "summer-launch".to_string(),
        brand_name: "Acme Cola".to_string(),
        brand_keywords: vec!["acme".to_string()],
        competitors: vec!["Brand X".to_string()],
        providers,
        timeout_secs: 30,
        temperature: 0.7,
        max_tokens: 512,
        questions: vec![
            "What is the best cola?".to_string(),
            "Which sodas are popular?".to_string(),
        ],
    }
}

#[test]
fn valid_definition_passes_validation() {
    valid_definition().validate().expect("should validate");
}

#[test]
fn empty_questions_are_rejected() {
    let mut def = valid_definition();
    def.questions.clear();
    assert!(matches!(def.validate(), Err(ConfigError::Validation(_))));

    let mut def = valid_definition();
    def.questions[1] = "   ".to_string();
    assert!(matches!(def.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn zero_iteration_provider_is_rejected() {
    let mut def = valid_definition();
    def.providers
        .insert(Provider::Perplexity, provider_settings(0, 1));
    assert!(matches!(def.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn non_positive_credit_cost_is_rejected() {
    let mut def = valid_definition();
    def.providers
        .insert(Provider::Perplexity, provider_settings(3, 0));
    assert!(matches!(def.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn snapshot_totals_cover_all_providers() {
    let snapshot = valid_definition().snapshot();
    // 10 openai + 5 anthropic iterations per question.
    assert_eq!(snapshot.iterations_per_question(), 15);
    // 2 questions: openai 2*10*1 + anthropic 2*5*2 = 40.
    assert_eq!(snapshot.estimated_credits(2), 40);
}

#[test]
fn definition_parses_from_yaml() {
    let yaml = r"
name: summer-launch
brand_name: Acme Cola
brand_keywords: [acme, acme-cola]
competitors: [Brand X]
providers:
  openai:
    model: gpt-test
    iterations: 3
    credit_cost: 1
timeout_secs: 45
questions:
  - What is the best cola?
";
    let def: ScanDefinition = serde_yaml::from_str(yaml).expect("should parse");
    def.validate().expect("should validate");
    assert_eq!(def.timeout_secs, 45);
    // Defaults applied for fields the YAML omits.
    assert!((def.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(def.max_tokens, 1024);
    assert_eq!(
        def.providers[&Provider::OpenAi].model,
        "gpt-test".to_string()
    );
}
