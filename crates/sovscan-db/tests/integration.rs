//! Offline unit tests for sovscan-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use sovscan_core::{
    PauseReason, Provider, ProviderSettings, QuestionRollup, ScanStatus, SettingsSnapshot,
};
use sovscan_db::{DbError, IterationRow, PoolConfig, QuestionRow, ScanRow};

fn sample_snapshot() -> SettingsSnapshot {
    let mut providers = BTreeMap::new();
    providers.insert(
        Provider::OpenAi,
        ProviderSettings {
            model: "gpt-test".to_string(),
            iterations: 2,
            credit_cost: 5,
        },
    );
    SettingsSnapshot {
        brand_name: "Acme Cola".to_string(),
        brand_keywords: vec![],
        competitors: vec![],
        providers,
        timeout_secs: 60,
        temperature: 0.7,
        max_tokens: 1024,
    }
}

fn sample_scan_row(status: &str) -> ScanRow {
    ScanRow {
        id: 1,
        public_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        brand_name: "Acme Cola".to_string(),
        question_set: "colas".to_string(),
        status: status.to_string(),
        pause_reason: None,
        pause_requested: false,
        total_questions: 1,
        completed_questions: 0,
        total_iterations: 2,
        completed_iterations: 0,
        estimated_credits: 10,
        used_credits: 0,
        overall_exposure_rate: None,
        resume_attempts: 0,
        settings: Json(sample_snapshot()),
        started_at: None,
        paused_at: None,
        resumed_at: None,
        completed_at: None,
        created_at: Utc::now(),
    }
}

#[test]
fn pool_config_defaults_are_sane() {
    let config = PoolConfig::default();
    assert!(config.max_connections >= config.min_connections);
    assert!(config.acquire_timeout_secs > 0);
}

#[test]
fn scan_row_parses_status_strings() {
    let scan = sample_scan_row("running").into_scan().expect("valid row");
    assert_eq!(scan.status, ScanStatus::Running);
    assert_eq!(scan.settings.providers.len(), 1);
}

#[test]
fn scan_row_rejects_unknown_status() {
    let err = sample_scan_row("archived").into_scan().expect_err("bad status");
    assert!(matches!(err, DbError::Decode(_)));
}

#[test]
fn scan_row_parses_pause_reason() {
    let mut row = sample_scan_row("paused");
    row.pause_reason = Some("rate_limit".to_string());
    let scan = row.into_scan().expect("valid row");
    assert_eq!(scan.pause_reason, Some(PauseReason::RateLimit));
}

#[test]
fn question_row_converts_to_domain() {
    let row = QuestionRow {
        id: 7,
        scan_id: 1,
        question_text: "best cola?".to_string(),
        order_index: 0,
        status: "pending".to_string(),
        rollup: Json(QuestionRollup::default()),
        last_error: None,
        retry_count: 0,
        created_at: Utc::now(),
    };
    let question = row.into_question().expect("valid row");
    assert_eq!(question.question_text, "best cola?");
    assert!(question.rollup.providers.is_empty());
}

#[test]
fn iteration_row_rejects_unknown_provider() {
    let row = IterationRow {
        id: 1,
        question_id: 7,
        provider: "mistral".to_string(),
        iteration_index: 0,
        status: "success".to_string(),
        response_text: None,
        brand_mentioned: None,
        mention_position: None,
        sentiment: None,
        competitor_mentions: Json(BTreeMap::new()),
        citations: vec![],
        latency_ms: None,
        error_message: None,
        created_at: Utc::now(),
    };
    assert!(matches!(row.into_record(), Err(DbError::Decode(_))));
}
