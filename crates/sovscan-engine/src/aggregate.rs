//! Pure, idempotent folds from terminal iterations to rollups.
//!
//! Everything here recomputes from scratch on every call: resume re-triggers
//! aggregation for partially-completed questions, so the fold must yield the
//! same result no matter how many times it runs over the same rows. Arrival
//! order never matters; the fold is commutative over the iteration set.

use std::collections::BTreeMap;

use sovscan_core::{
    IterationRecord, IterationStatus, ProviderStats, QuestionRollup, QuestionStatus, Sentiment,
    SentimentCounts, SettingsSnapshot,
};

/// Fold a question's terminal iterations into its rollup.
///
/// Per-provider exposure rate is `mentions / classified`, where `classified`
/// counts successful iterations whose `brand_mentioned` is known; failed and
/// timed-out iterations count toward completion but never enter a rate
/// denominator. `avg_exposure_rate` is the unweighted mean over providers
/// with at least one classified iteration; providers with none are excluded
/// rather than counted as zero.
#[must_use]
pub fn question_rollup(
    settings: &SettingsSnapshot,
    iterations: &[IterationRecord],
) -> QuestionRollup {
    let mut providers: BTreeMap<_, ProviderStats> = settings
        .providers
        .iter()
        .map(|(provider, ps)| {
            (
                *provider,
                ProviderStats {
                    total: ps.iterations,
                    ..ProviderStats::default()
                },
            )
        })
        .collect();

    let mut competitor_mentions: BTreeMap<String, u32> = BTreeMap::new();
    let mut sentiment = SentimentCounts::default();

    for iteration in iterations {
        if !iteration.status.is_terminal() {
            continue;
        }
        let Some(stats) = providers.get_mut(&iteration.provider) else {
            // Row from a provider the snapshot does not configure; ignore.
            continue;
        };
        stats.completed += 1;

        if iteration.status != IterationStatus::Success {
            continue;
        }
        stats.succeeded += 1;
        if let Some(mentioned) = iteration.brand_mentioned {
            stats.classified += 1;
            if mentioned {
                stats.mentions += 1;
            }
        }
        match iteration.sentiment {
            Some(Sentiment::Positive) => sentiment.positive += 1,
            Some(Sentiment::Neutral) => sentiment.neutral += 1,
            Some(Sentiment::Negative) => sentiment.negative += 1,
            None => {}
        }
        for (name, count) in &iteration.competitor_mentions {
            *competitor_mentions.entry(name.clone()).or_insert(0) += count;
        }
    }

    for stats in providers.values_mut() {
        stats.exposure_rate = (stats.classified > 0)
            .then(|| f64::from(stats.mentions) / f64::from(stats.classified));
    }

    let rates: Vec<f64> = providers
        .values()
        .filter_map(|s| s.exposure_rate)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let avg_exposure_rate =
        (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64);

    QuestionRollup {
        providers,
        avg_exposure_rate,
        competitor_mentions,
        sentiment,
    }
}

/// Derive a question's status from its rollup.
///
/// A question is `Completed` once every configured provider has all its
/// iterations terminal; a failed iteration still counts as terminal. It is
/// `Failed` only in the degenerate case where everything terminal failed and
/// nothing succeeded.
#[must_use]
pub fn question_status(rollup: &QuestionRollup) -> QuestionStatus {
    let complete = rollup
        .providers
        .values()
        .all(|s| s.completed >= s.total);
    let any_terminal = rollup.providers.values().any(|s| s.completed > 0);
    let any_success = rollup.providers.values().any(|s| s.succeeded > 0);

    if complete {
        if any_terminal && !any_success {
            // All iterations landed and every one of them failed.
            QuestionStatus::Failed
        } else {
            QuestionStatus::Completed
        }
    } else if any_terminal {
        QuestionStatus::Running
    } else {
        QuestionStatus::Pending
    }
}

/// Mean of the available per-question average exposure rates, weighted
/// equally per question so questions with fewer configured iterations are
/// not under-weighted.
#[must_use]
pub fn overall_exposure_rate(rollups: &[QuestionRollup]) -> Option<f64> {
    let rates: Vec<f64> = rollups.iter().filter_map(|r| r.avg_exposure_rate).collect();
    #[allow(clippy::cast_precision_loss)]
    (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64)
}

/// Scan-level progress derived from question rollups: terminal questions and
/// terminal iterations.
#[must_use]
pub fn scan_progress(rollups_with_status: &[(QuestionRollup, QuestionStatus)]) -> (i32, i32) {
    let completed_questions = rollups_with_status
        .iter()
        .filter(|(_, status)| {
            matches!(status, QuestionStatus::Completed | QuestionStatus::Failed)
        })
        .count();
    let completed_iterations: u32 = rollups_with_status
        .iter()
        .flat_map(|(rollup, _)| rollup.providers.values())
        .map(|s| s.completed)
        .sum();

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    (completed_questions as i32, completed_iterations as i32)
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
