use std::collections::BTreeMap;

use sovscan_core::{
    IterationStatus, NewIteration, PauseReason, Provider, QuestionStatus, ScanStore,
};

use super::{dispatch_scan, DispatchOutcome};
use crate::testutil::{definition, seed_scan, test_config, MemoryStore, ScriptedApi, ScriptedResponse};

const ANSWER: &str = "For most people I would recommend Acme Cola over the alternatives.";

#[tokio::test]
async fn full_pass_completes_the_scan_and_rolls_up_every_question() {
    let store = MemoryStore::new();
    let def = definition(
        &[(Provider::OpenAi, 2, 1)],
        &["best cola?", "most popular soda?"],
    );
    let scan = seed_scan(&store, &def).await;
    let api = ScriptedApi::new(ANSWER);

    let outcome = dispatch_scan(&store, &api, &test_config(), &scan)
        .await
        .expect("dispatch");

    assert!(matches!(outcome, DispatchOutcome::Completed));
    assert_eq!(api.call_count(), 4);

    let stored = store.get_scan(scan.id).await.expect("scan");
    assert_eq!(stored.completed_questions, 2);
    assert_eq!(stored.completed_iterations, 4);
    assert_eq!(stored.overall_exposure_rate, Some(1.0));
    assert_eq!(stored.used_credits, 4);

    for question in store.list_questions(scan.id).await.expect("questions") {
        assert_eq!(question.status, QuestionStatus::Completed);
        assert_eq!(
            question.rollup.providers[&Provider::OpenAi].exposure_rate,
            Some(1.0)
        );
    }
}

#[tokio::test]
async fn redispatch_skips_units_with_terminal_rows() {
    let store = MemoryStore::new();
    let def = definition(
        &[(Provider::OpenAi, 2, 1)],
        &["best cola?", "most popular soda?"],
    );
    let scan = seed_scan(&store, &def).await;
    let first_question = store.list_questions(scan.id).await.expect("questions")[0].id;
    // One unit already landed in an earlier (interrupted) pass.
    store
        .insert_iteration(&NewIteration {
            question_id: first_question,
            provider: Provider::OpenAi,
            iteration_index: 0,
            status: IterationStatus::Success,
            response_text: Some(ANSWER.to_string()),
            brand_mentioned: Some(true),
            mention_position: Some(1),
            sentiment: None,
            competitor_mentions: BTreeMap::new(),
            citations: Vec::new(),
            latency_ms: Some(5),
            error_message: None,
        })
        .await
        .expect("insert");

    let api = ScriptedApi::new(ANSWER);
    let outcome = dispatch_scan(&store, &api, &test_config(), &scan)
        .await
        .expect("dispatch");

    assert!(matches!(outcome, DispatchOutcome::Completed));
    // Only the three outstanding units were dispatched.
    assert_eq!(api.call_count(), 3);
    assert_eq!(store.all_iterations().len(), 4);
}

#[tokio::test]
async fn pause_request_halts_before_any_submission() {
    let store = MemoryStore::new();
    let def = definition(&[(Provider::OpenAi, 2, 1)], &["best cola?"]);
    let scan = seed_scan(&store, &def).await;
    store
        .set_pause_requested(scan.id, true)
        .await
        .expect("flag");

    let api = ScriptedApi::new(ANSWER);
    let outcome = dispatch_scan(&store, &api, &test_config(), &scan)
        .await
        .expect("dispatch");

    assert!(matches!(
        outcome,
        DispatchOutcome::Paused(PauseReason::UserPaused)
    ));
    assert_eq!(api.call_count(), 0);
    assert!(store.all_iterations().is_empty());
}

#[tokio::test]
async fn persistent_transient_failures_pause_the_scan() {
    let store = MemoryStore::new();
    let def = definition(&[(Provider::OpenAi, 6, 1)], &["best cola?"]);
    let scan = seed_scan(&store, &def).await;
    let api = ScriptedApi::new(ANSWER);
    // Every attempt of every unit fails with a retryable upstream error.
    api.script(
        Provider::OpenAi,
        std::iter::repeat(ScriptedResponse::ServerError).take(15).collect(),
    );

    let outcome = dispatch_scan(&store, &api, &test_config(), &scan)
        .await
        .expect("dispatch");

    assert!(matches!(
        outcome,
        DispatchOutcome::Paused(PauseReason::NetworkError)
    ));
    // Five units ran to the retry ceiling (three attempts each), then the
    // streak threshold halted the pass before the sixth.
    assert_eq!(api.call_count(), 15);
    let rows = store.all_iterations();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.status == IterationStatus::Failed));

    let question = store.list_questions(scan.id).await.expect("questions").remove(0);
    assert_eq!(question.status, QuestionStatus::Running);
}

#[tokio::test]
async fn isolated_failures_within_budget_still_complete_the_scan() {
    let store = MemoryStore::new();
    let def = definition(
        &[(Provider::OpenAi, 2, 1), (Provider::Anthropic, 2, 1)],
        &["best cola?", "most popular soda?"],
    );
    let scan = seed_scan(&store, &def).await;
    let api = ScriptedApi::new(ANSWER);
    // One anthropic unit times out through all its attempts; everything
    // else succeeds.
    api.script(
        Provider::Anthropic,
        vec![
            ScriptedResponse::Timeout,
            ScriptedResponse::Timeout,
            ScriptedResponse::Timeout,
        ],
    );

    let outcome = dispatch_scan(&store, &api, &test_config(), &scan)
        .await
        .expect("dispatch");

    assert!(matches!(outcome, DispatchOutcome::Completed));
    let rows = store.all_iterations();
    assert_eq!(rows.len(), 8);
    assert_eq!(
        rows.iter().filter(|r| r.status == IterationStatus::Timeout).count(),
        1
    );

    let stored = store.get_scan(scan.id).await.expect("scan");
    assert_eq!(stored.completed_questions, 2);
    assert_eq!(stored.completed_iterations, 8);
    assert_eq!(stored.overall_exposure_rate, Some(1.0));

    let questions = store.list_questions(scan.id).await.expect("questions");
    assert!(questions.iter().all(|q| q.status == QuestionStatus::Completed));
    let anthropic = &questions[0].rollup.providers[&Provider::Anthropic];
    assert_eq!((anthropic.completed, anthropic.succeeded), (2, 1));
}
