//! Scan lifecycle: pending → running ↔ paused → completed/failed.
//!
//! The orchestrator is deliberately stateless between calls: every decision
//! is derived from the durable store, so the process driving a scan can
//! restart between pause and resume without losing anything. The entry
//! points mirror the external job-trigger surface: `start` and `resume`.

use uuid::Uuid;

use sovscan_core::{
    AppConfig, BatchScan, NewScan, PauseReason, ScanDefinition, ScanStatus, ScanStore,
};
use sovscan_providers::CompletionApi;

use crate::aggregate::overall_exposure_rate;
use crate::dispatch::{dispatch_scan, DispatchOutcome};
use crate::EngineError;

/// Engine tuning knobs, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Global cap on concurrently running iterations, across questions and
    /// providers.
    pub max_concurrency: usize,
    /// Total provider-call attempts per iteration (1 initial + retries).
    pub max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    /// `resume` attempts allowed before a paused scan is failed.
    pub max_resume_attempts: i32,
    /// Consecutive transiently-failed iterations before the scan pauses with
    /// `network_error`.
    pub network_pause_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_attempts: 3,
            retry_backoff_base_ms: 1_000,
            max_resume_attempts: 5,
            network_pause_threshold: 5,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            max_attempts: config.max_attempts,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
            max_resume_attempts: config.max_resume_attempts,
            ..Self::default()
        }
    }
}

/// How a `start`/`resume` invocation left the scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed { overall_exposure_rate: f64 },
    Paused(PauseReason),
    Failed(Option<PauseReason>),
}

/// Owns the batch-scan state machine over a store and a provider capability.
pub struct ScanOrchestrator<S, C> {
    store: S,
    api: C,
    config: EngineConfig,
}

impl<S: ScanStore, C: CompletionApi> ScanOrchestrator<S, C> {
    pub fn new(store: S, api: C, config: EngineConfig) -> Self {
        Self { store, api, config }
    }

    /// Direct read access to the underlying store, for status reporting.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a scan in `pending` from a validated definition: capture the
    /// settings snapshot, compute the credit estimate, insert one question
    /// row per ordered question.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if persistence fails.
    pub async fn create_scan(
        &self,
        user_id: Uuid,
        definition: &ScanDefinition,
    ) -> Result<BatchScan, EngineError> {
        let snapshot = definition.snapshot();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let total_questions = definition.questions.len() as i32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let total_iterations =
            total_questions * snapshot.iterations_per_question() as i32;
        #[allow(clippy::cast_sign_loss)]
        let estimated_credits = snapshot.estimated_credits(total_questions as u32);

        let scan = NewScan {
            public_id: Uuid::new_v4(),
            user_id,
            brand_name: definition.brand_name.clone(),
            question_set: definition.name.clone(),
            total_questions,
            total_iterations,
            estimated_credits,
            settings: snapshot,
        };

        let stored = self.store.create_scan(&scan, &definition.questions).await?;
        tracing::info!(
            scan_id = stored.id,
            public_id = %stored.public_id,
            questions = total_questions,
            iterations = total_iterations,
            estimated_credits,
            "created batch scan"
        );
        Ok(stored)
    }

    /// Admit a `pending` scan and run it until it completes, pauses or fails.
    ///
    /// The caller is expected to have verified the user's account-level
    /// balance covers `estimated_credits`; the engine only enforces the
    /// scan-scoped estimate from here on.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] if the scan is not `pending`.
    pub async fn start(&self, scan_id: i64) -> Result<ScanOutcome, EngineError> {
        let scan = self.store.get_scan(scan_id).await?;
        if scan.status != ScanStatus::Pending {
            return Err(EngineError::InvalidState {
                id: scan_id,
                status: scan.status,
                expected: "pending",
            });
        }
        self.store
            .mark_scan_running(scan_id, ScanStatus::Pending)
            .await?;
        tracing::info!(scan_id, "scan admitted to running");
        self.run(scan_id).await
    }

    /// Resume a `paused` scan. Outstanding work is re-enumerated from the
    /// store, so a resumed scan converges to the same terminal iteration set
    /// an uninterrupted run would have produced.
    ///
    /// Exceeding the configured resume-attempt budget fails the scan instead
    /// of re-admitting it.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] if the scan is not `paused`.
    pub async fn resume(&self, scan_id: i64) -> Result<ScanOutcome, EngineError> {
        let scan = self.store.get_scan(scan_id).await?;
        if scan.status != ScanStatus::Paused {
            return Err(EngineError::InvalidState {
                id: scan_id,
                status: scan.status,
                expected: "paused",
            });
        }

        let attempts = self.store.increment_resume_attempts(scan_id).await?;
        if attempts > self.config.max_resume_attempts {
            tracing::error!(
                scan_id,
                attempts,
                max = self.config.max_resume_attempts,
                "resume attempt budget exhausted, failing scan"
            );
            self.store
                .mark_scan_failed(scan_id, scan.pause_reason)
                .await?;
            return Ok(ScanOutcome::Failed(scan.pause_reason));
        }

        self.store
            .mark_scan_running(scan_id, ScanStatus::Paused)
            .await?;
        tracing::info!(scan_id, attempts, "scan resumed");
        self.run(scan_id).await
    }

    /// Request a pause of a running scan. Takes effect before the next
    /// dispatched iteration; in-flight calls drain to completion.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] if the scan is already terminal.
    pub async fn request_pause(&self, scan_id: i64) -> Result<(), EngineError> {
        let scan = self.store.get_scan(scan_id).await?;
        if scan.status.is_terminal() {
            return Err(EngineError::InvalidState {
                id: scan_id,
                status: scan.status,
                expected: "pending, running or paused",
            });
        }
        self.store.set_pause_requested(scan_id, true).await?;
        tracing::info!(scan_id, "pause requested");
        Ok(())
    }

    /// One dispatch pass plus the resulting lifecycle transition.
    async fn run(&self, scan_id: i64) -> Result<ScanOutcome, EngineError> {
        // Re-read: mark_scan_running refreshed timestamps and flags.
        let scan = self.store.get_scan(scan_id).await?;

        match dispatch_scan(&self.store, &self.api, &self.config, &scan).await? {
            DispatchOutcome::Completed => {
                let questions = self.store.list_questions(scan_id).await?;
                let rollups: Vec<_> = questions.into_iter().map(|q| q.rollup).collect();
                let overall = overall_exposure_rate(&rollups).unwrap_or(0.0);
                self.store.mark_scan_completed(scan_id, overall).await?;
                tracing::info!(scan_id, overall_exposure_rate = overall, "scan completed");
                Ok(ScanOutcome::Completed {
                    overall_exposure_rate: overall,
                })
            }
            DispatchOutcome::Paused(reason) => {
                self.store.mark_scan_paused(scan_id, reason).await?;
                tracing::warn!(scan_id, reason = %reason, "scan paused");
                Ok(ScanOutcome::Paused(reason))
            }
            DispatchOutcome::Failed(message) => {
                tracing::error!(scan_id, message = %message, "scan failed");
                self.store.mark_scan_failed(scan_id, None).await?;
                Ok(ScanOutcome::Failed(None))
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
