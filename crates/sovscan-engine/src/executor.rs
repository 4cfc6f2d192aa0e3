//! Runs one (question, provider, iteration-index) unit end to end.
//!
//! Reserve credit → call the provider with bounded retry → classify the
//! answer → insert exactly one terminal iteration row. A crashed or raced
//! attempt leaves the row absent, which is what makes re-dispatch on resume
//! safe: the row's uniqueness key is the idempotency key.

use std::collections::BTreeMap;
use std::time::Instant;

use sovscan_classify::classify_response;
use sovscan_core::{
    BatchScan, IterationStatus, NewIteration, PauseReason, Provider, ScanStore,
};
use sovscan_providers::{ChatMessage, CompletionApi, CompletionOptions, ProviderError};

use crate::ledger::{CreditLedger, Reservation};
use crate::orchestrator::EngineConfig;
use crate::retry::retry_with_backoff;
use crate::EngineError;

/// One unit of outstanding work.
#[derive(Debug, Clone)]
pub(crate) struct IterationUnit {
    pub question_id: i64,
    pub question_text: String,
    pub provider: Provider,
    pub iteration_index: i32,
}

/// What the dispatcher should do after one unit.
#[derive(Debug)]
pub(crate) enum IterationOutcome {
    /// A terminal row landed (or a concurrent dispatch beat us to it).
    /// `transient_failure` marks rows that failed on retryable classes, so
    /// the dispatcher can pause on persistent network trouble.
    Recorded {
        status: IterationStatus,
        transient_failure: bool,
    },
    /// Stop submitting new work and pause the scan.
    Pause(PauseReason),
    /// Unrecoverable configuration problem; fail the scan.
    Fatal(String),
}

/// Execute one iteration unit against `api`, persisting the outcome.
///
/// Guarantees at most one terminal row per unit key. Charges stick for every
/// recorded row, successful or not; they are released when the call produced
/// no recorded row, whether because the provider refused it (pause triggers)
/// or because a concurrent dispatch already landed the row and this result
/// was discarded.
pub(crate) async fn run_iteration<S: ScanStore, C: CompletionApi>(
    store: &S,
    api: &C,
    config: &EngineConfig,
    scan: &BatchScan,
    unit: &IterationUnit,
) -> Result<IterationOutcome, EngineError> {
    let settings = &scan.settings;
    let ledger = CreditLedger::new(store, scan.id);

    let amount = match ledger.reserve(unit.provider, settings).await? {
        Reservation::Reserved { amount } => amount,
        Reservation::InsufficientCredits => {
            tracing::warn!(
                scan_id = scan.id,
                provider = %unit.provider,
                "credit estimate exhausted, pausing scan"
            );
            return Ok(IterationOutcome::Pause(PauseReason::InsufficientCredits));
        }
    };

    let Some(provider_settings) = settings.providers.get(&unit.provider) else {
        ledger.release(amount).await?;
        return Ok(IterationOutcome::Fatal(format!(
            "provider '{}' missing from settings snapshot",
            unit.provider
        )));
    };

    let messages = vec![ChatMessage::user(unit.question_text.clone())];
    let options = CompletionOptions {
        model: provider_settings.model.clone(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        timeout_secs: settings.timeout_secs,
    };

    let started = Instant::now();
    let result = retry_with_backoff(config.max_attempts, config.retry_backoff_base_ms, || {
        api.complete(unit.provider, &messages, &options)
    })
    .await;
    #[allow(clippy::cast_possible_truncation)]
    let latency_ms = started.elapsed().as_millis() as i64;

    match result {
        Ok(completion) => {
            let iteration = if completion.text.trim().is_empty() {
                // The call succeeded but there is nothing to classify; keep
                // the row (and the spent credit) with null derived fields.
                NewIteration {
                    question_id: unit.question_id,
                    provider: unit.provider,
                    iteration_index: unit.iteration_index,
                    status: IterationStatus::Success,
                    response_text: Some(completion.text),
                    brand_mentioned: None,
                    mention_position: None,
                    sentiment: None,
                    competitor_mentions: BTreeMap::new(),
                    citations: completion.citations,
                    latency_ms: Some(latency_ms),
                    error_message: None,
                }
            } else {
                let classification =
                    classify_response(&completion.text, &completion.citations, settings);
                NewIteration {
                    question_id: unit.question_id,
                    provider: unit.provider,
                    iteration_index: unit.iteration_index,
                    status: IterationStatus::Success,
                    response_text: Some(completion.text),
                    brand_mentioned: Some(classification.brand_mentioned),
                    mention_position: classification.mention_position,
                    sentiment: Some(classification.sentiment),
                    competitor_mentions: classification.competitor_mentions,
                    citations: classification.citations,
                    latency_ms: Some(latency_ms),
                    error_message: None,
                }
            };
            if !record(store, unit, &iteration).await? {
                ledger.release(amount).await?;
            }
            Ok(IterationOutcome::Recorded {
                status: IterationStatus::Success,
                transient_failure: false,
            })
        }
        Err(err @ (ProviderError::RateLimited { .. } | ProviderError::AuthFailed { .. })) => {
            // Nothing recorded; the provider refused the call, so the charge
            // goes back before the scan pauses.
            ledger.release(amount).await?;
            let reason = match err {
                ProviderError::RateLimited { .. } => PauseReason::RateLimit,
                _ => PauseReason::AuthError,
            };
            tracing::warn!(
                scan_id = scan.id,
                provider = %unit.provider,
                error = %err,
                "non-retryable provider error, pausing scan"
            );
            Ok(IterationOutcome::Pause(reason))
        }
        Err(ProviderError::NotConfigured(provider)) => {
            ledger.release(amount).await?;
            Ok(IterationOutcome::Fatal(format!(
                "provider '{provider}' is configured in the scan but has no client"
            )))
        }
        Err(err) => {
            // Retry ceiling reached (transient classes) or a permanent
            // per-call failure. Record the row so the unit is terminal and
            // the question's error bookkeeping advances.
            let status = match err {
                ProviderError::Timeout => IterationStatus::Timeout,
                _ => IterationStatus::Failed,
            };
            let transient_failure = err.is_transient();
            let iteration = NewIteration {
                question_id: unit.question_id,
                provider: unit.provider,
                iteration_index: unit.iteration_index,
                status,
                response_text: None,
                brand_mentioned: None,
                mention_position: None,
                sentiment: None,
                competitor_mentions: BTreeMap::new(),
                citations: Vec::new(),
                latency_ms: Some(latency_ms),
                error_message: Some(err.to_string()),
            };
            if record(store, unit, &iteration).await? {
                store
                    .record_question_error(unit.question_id, &err.to_string())
                    .await?;
            } else {
                ledger.release(amount).await?;
            }
            Ok(IterationOutcome::Recorded {
                status,
                transient_failure,
            })
        }
    }
}

/// Insert the terminal row, tolerating a lost race with another dispatcher.
///
/// Returns whether this call's row landed. A `false` means a concurrent or
/// prior dispatch won the uniqueness key; the caller must release the charge
/// backing the discarded result so the estimate stays available for units
/// that still need it.
async fn record<S: ScanStore>(
    store: &S,
    unit: &IterationUnit,
    iteration: &NewIteration,
) -> Result<bool, EngineError> {
    let inserted = store.insert_iteration(iteration).await?;
    if !inserted {
        tracing::warn!(
            question_id = unit.question_id,
            provider = %unit.provider,
            iteration_index = unit.iteration_index,
            "iteration row already exists, discarding duplicate result"
        );
    }
    Ok(inserted)
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
