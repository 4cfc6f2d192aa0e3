//! Enumerates outstanding work for a scan and drives it with bounded
//! concurrency.
//!
//! Outstanding work is whatever `(question, provider, index)` tuples have no
//! terminal row yet; the store is the single source of truth, so a resumed
//! scan enumerates exactly what an uninterrupted one would still have to do.
//! The first pause trigger stops new submissions; in-flight iterations drain
//! to completion so no charged call goes unrecorded.

use std::cell::RefCell;
use std::collections::HashSet;

use futures::stream::{self, StreamExt};

use sovscan_core::{BatchScan, PauseReason, ScanStore};
use sovscan_providers::CompletionApi;

use crate::aggregate::{overall_exposure_rate, question_rollup, question_status, scan_progress};
use crate::executor::{run_iteration, IterationOutcome, IterationUnit};
use crate::orchestrator::EngineConfig;
use crate::EngineError;

/// How one dispatch pass ended.
#[derive(Debug)]
pub(crate) enum DispatchOutcome {
    /// Every configured iteration of every question is terminal.
    Completed,
    Paused(PauseReason),
    Failed(String),
}

/// What stopped the submission loop.
enum Halt {
    Pause(PauseReason),
    Fatal(String),
}

/// Run one dispatch pass over `scan`: enumerate outstanding units, execute
/// them under the concurrency cap, then refresh every question rollup and
/// the scan's derived progress.
pub(crate) async fn dispatch_scan<S: ScanStore, C: CompletionApi>(
    store: &S,
    api: &C,
    config: &EngineConfig,
    scan: &BatchScan,
) -> Result<DispatchOutcome, EngineError> {
    let questions = store.list_questions(scan.id).await?;

    // Resume safety: only indices with no terminal row are dispatched.
    let mut units: Vec<IterationUnit> = Vec::new();
    for question in &questions {
        let existing = store.list_iterations(question.id).await?;
        let terminal: HashSet<(_, i32)> = existing
            .iter()
            .filter(|it| it.status.is_terminal())
            .map(|it| (it.provider, it.iteration_index))
            .collect();

        for (provider, provider_settings) in &scan.settings.providers {
            for index in 0..provider_settings.iterations {
                #[allow(clippy::cast_possible_wrap)]
                let index = index as i32;
                if !terminal.contains(&(*provider, index)) {
                    units.push(IterationUnit {
                        question_id: question.id,
                        question_text: question.question_text.clone(),
                        provider: *provider,
                        iteration_index: index,
                    });
                }
            }
        }
    }

    tracing::info!(
        scan_id = scan.id,
        outstanding = units.len(),
        total_iterations = scan.total_iterations,
        "dispatching outstanding iterations"
    );

    // Shared across concurrently polled unit futures on this task. Set once
    // by the first halt condition; later units see it before reserving.
    let halt: RefCell<Option<Halt>> = RefCell::new(None);
    let transient_streak = RefCell::new(0u32);

    let results: Vec<Result<(), EngineError>> = stream::iter(units)
        .map(|unit| {
            let halt = &halt;
            let transient_streak = &transient_streak;
            async move {
                if halt.borrow().is_some() {
                    return Ok(());
                }
                // A user pause request is durable state; honour it before
                // charging anything for this unit.
                if store.get_scan(scan.id).await?.pause_requested {
                    halt.borrow_mut()
                        .get_or_insert(Halt::Pause(PauseReason::UserPaused));
                    return Ok(());
                }

                match run_iteration(store, api, config, scan, &unit).await? {
                    IterationOutcome::Recorded {
                        transient_failure, ..
                    } => {
                        if transient_failure {
                            let mut streak = transient_streak.borrow_mut();
                            *streak += 1;
                            if *streak >= config.network_pause_threshold {
                                halt.borrow_mut()
                                    .get_or_insert(Halt::Pause(PauseReason::NetworkError));
                            }
                        } else {
                            *transient_streak.borrow_mut() = 0;
                        }
                    }
                    IterationOutcome::Pause(reason) => {
                        halt.borrow_mut().get_or_insert(Halt::Pause(reason));
                    }
                    IterationOutcome::Fatal(message) => {
                        halt.borrow_mut().get_or_insert(Halt::Fatal(message));
                    }
                }
                Ok(())
            }
        })
        .buffer_unordered(config.max_concurrency)
        .collect()
        .await;
    for result in results {
        result?;
    }

    // Refresh rollups from landed rows. Idempotent by construction, so doing
    // it after a partial (halted) pass is safe.
    let mut rollups_with_status = Vec::with_capacity(questions.len());
    for question in &questions {
        let iterations = store.list_iterations(question.id).await?;
        let rollup = question_rollup(&scan.settings, &iterations);
        let status = question_status(&rollup);
        store.update_question(question.id, status, &rollup).await?;
        rollups_with_status.push((rollup, status));
    }

    let (completed_questions, completed_iterations) = scan_progress(&rollups_with_status);
    let rollups: Vec<_> = rollups_with_status
        .iter()
        .map(|(rollup, _)| rollup.clone())
        .collect();
    let overall = overall_exposure_rate(&rollups);
    store
        .update_scan_progress(scan.id, completed_questions, completed_iterations, overall)
        .await?;

    match halt.into_inner() {
        Some(Halt::Pause(reason)) => Ok(DispatchOutcome::Paused(reason)),
        Some(Halt::Fatal(message)) => Ok(DispatchOutcome::Failed(message)),
        None => {
            if completed_questions == scan.total_questions {
                Ok(DispatchOutcome::Completed)
            } else {
                // Drained without a halt but work remains: only possible if
                // duplicate-row races discarded results mid-pass. Treat as a
                // transient network condition and let resume pick it up.
                Ok(DispatchOutcome::Paused(PauseReason::NetworkError))
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
