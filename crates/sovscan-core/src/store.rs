//! The durable-store seam between the orchestration engine and storage.
//!
//! The engine never talks to Postgres directly; it goes through [`ScanStore`]
//! so every lifecycle decision is reconstructible from durable state and the
//! engine is testable against an in-memory implementation. The Postgres
//! implementation lives in `sovscan-db`.

use uuid::Uuid;

use crate::scan::{
    BatchScan, BatchScanQuestion, IterationRecord, NewIteration, NewScan, PauseReason,
    QuestionRollup, QuestionStatus, ScanStatus,
};

/// Errors surfaced by a [`ScanStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// A guarded status update matched zero rows: the scan was not in the
    /// status the transition requires.
    #[error("invalid scan transition for id {id}: expected status '{expected}'")]
    InvalidTransition { id: i64, expected: &'static str },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Indexed read/insert/update over the three scan collections, plus the
/// atomic operations the engine's safety arguments rest on: the
/// compare-and-increment credit reserve and the insert-once iteration row.
#[allow(async_fn_in_trait)]
pub trait ScanStore {
    async fn get_scan(&self, scan_id: i64) -> Result<BatchScan, StoreError>;

    async fn get_scan_by_public_id(&self, public_id: Uuid) -> Result<BatchScan, StoreError>;

    /// Insert a scan in `pending` status plus one question row per entry of
    /// `questions`, in order. Returns the stored scan.
    async fn create_scan(
        &self,
        scan: &NewScan,
        questions: &[String],
    ) -> Result<BatchScan, StoreError>;

    /// Guarded `from → running` transition. `from` must be `Pending` (stamps
    /// `started_at`) or `Paused` (stamps `resumed_at` and clears the pause
    /// reason and any pending pause request).
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidTransition`] if the scan is not in `from`.
    async fn mark_scan_running(&self, scan_id: i64, from: ScanStatus) -> Result<(), StoreError>;

    /// Guarded `running → paused` transition; records `reason` and stamps
    /// `paused_at`.
    async fn mark_scan_paused(&self, scan_id: i64, reason: PauseReason)
        -> Result<(), StoreError>;

    /// Guarded `running → completed` transition; persists the final overall
    /// exposure rate and stamps `completed_at`.
    async fn mark_scan_completed(
        &self,
        scan_id: i64,
        overall_exposure_rate: f64,
    ) -> Result<(), StoreError>;

    /// Transition to `failed` from `running` or `paused`, retaining the last
    /// blocking reason when one is known.
    async fn mark_scan_failed(
        &self,
        scan_id: i64,
        reason: Option<PauseReason>,
    ) -> Result<(), StoreError>;

    /// Set or clear the persisted user pause request flag.
    async fn set_pause_requested(&self, scan_id: i64, requested: bool) -> Result<(), StoreError>;

    /// Atomically increment `resume_attempts` and return the new value.
    async fn increment_resume_attempts(&self, scan_id: i64) -> Result<i32, StoreError>;

    /// Compare-and-increment reserve against the scan's estimate: succeeds
    /// (returns `true`) iff `used_credits + amount <= estimated_credits`
    /// after the increment. Atomic per scan; concurrent reservations can
    /// never overspend the estimate.
    async fn reserve_credits(&self, scan_id: i64, amount: i64) -> Result<bool, StoreError>;

    /// Return a previously reserved charge (floored at zero). Used when a
    /// charged call produced no recorded iteration, e.g. an auth failure
    /// that pauses the scan before the provider did any work.
    async fn release_credits(&self, scan_id: i64, amount: i64) -> Result<(), StoreError>;

    /// Questions of a scan in `order_index` order.
    async fn list_questions(&self, scan_id: i64) -> Result<Vec<BatchScanQuestion>, StoreError>;

    async fn list_iterations(
        &self,
        question_id: i64,
    ) -> Result<Vec<IterationRecord>, StoreError>;

    /// Insert a terminal iteration row. Returns `false` when a row for the
    /// same `(question_id, provider, iteration_index)` already exists; the
    /// uniqueness backstop that makes re-dispatch races harmless.
    async fn insert_iteration(&self, iteration: &NewIteration) -> Result<bool, StoreError>;

    /// Overwrite a question's status and rollup. Idempotent: the rollup is
    /// always recomputed in full from terminal iteration rows.
    async fn update_question(
        &self,
        question_id: i64,
        status: QuestionStatus,
        rollup: &QuestionRollup,
    ) -> Result<(), StoreError>;

    /// Record a per-question error: sets `last_error` and increments
    /// `retry_count`.
    async fn record_question_error(&self, question_id: i64, message: &str)
        -> Result<(), StoreError>;

    /// Overwrite the scan's derived progress counters and overall exposure
    /// rate. Counters are derived from landed iteration rows, never from
    /// dispatch order.
    async fn update_scan_progress(
        &self,
        scan_id: i64,
        completed_questions: i32,
        completed_iterations: i32,
        overall_exposure_rate: Option<f64>,
    ) -> Result<(), StoreError>;
}
