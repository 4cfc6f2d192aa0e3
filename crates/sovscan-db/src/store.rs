//! [`ScanStore`] implementation backed by Postgres.

use sqlx::PgPool;
use uuid::Uuid;

use sovscan_core::{
    BatchScan, BatchScanQuestion, IterationRecord, NewIteration, NewScan, PauseReason,
    QuestionRollup, QuestionStatus, ScanStatus, ScanStore, StoreError,
};

use crate::{iterations, questions, scans, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => StoreError::NotFound,
            DbError::InvalidScanTransition {
                id,
                expected_status,
            } => StoreError::InvalidTransition {
                id,
                expected: expected_status,
            },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// The production [`ScanStore`]: a thin adapter over the query modules.
#[derive(Debug, Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

impl PgScanStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ScanStore for PgScanStore {
    async fn get_scan(&self, scan_id: i64) -> Result<BatchScan, StoreError> {
        Ok(scans::get_scan(&self.pool, scan_id).await?)
    }

    async fn get_scan_by_public_id(&self, public_id: Uuid) -> Result<BatchScan, StoreError> {
        Ok(scans::get_scan_by_public_id(&self.pool, public_id).await?)
    }

    async fn create_scan(
        &self,
        scan: &NewScan,
        questions: &[String],
    ) -> Result<BatchScan, StoreError> {
        Ok(scans::create_scan(&self.pool, scan, questions).await?)
    }

    async fn mark_scan_running(&self, scan_id: i64, from: ScanStatus) -> Result<(), StoreError> {
        Ok(scans::mark_scan_running(&self.pool, scan_id, from).await?)
    }

    async fn mark_scan_paused(
        &self,
        scan_id: i64,
        reason: PauseReason,
    ) -> Result<(), StoreError> {
        Ok(scans::mark_scan_paused(&self.pool, scan_id, reason).await?)
    }

    async fn mark_scan_completed(
        &self,
        scan_id: i64,
        overall_exposure_rate: f64,
    ) -> Result<(), StoreError> {
        Ok(scans::mark_scan_completed(&self.pool, scan_id, overall_exposure_rate).await?)
    }

    async fn mark_scan_failed(
        &self,
        scan_id: i64,
        reason: Option<PauseReason>,
    ) -> Result<(), StoreError> {
        Ok(scans::mark_scan_failed(&self.pool, scan_id, reason).await?)
    }

    async fn set_pause_requested(&self, scan_id: i64, requested: bool) -> Result<(), StoreError> {
        Ok(scans::set_pause_requested(&self.pool, scan_id, requested).await?)
    }

    async fn increment_resume_attempts(&self, scan_id: i64) -> Result<i32, StoreError> {
        Ok(scans::increment_resume_attempts(&self.pool, scan_id).await?)
    }

    async fn reserve_credits(&self, scan_id: i64, amount: i64) -> Result<bool, StoreError> {
        Ok(scans::reserve_credits(&self.pool, scan_id, amount).await?)
    }

    async fn release_credits(&self, scan_id: i64, amount: i64) -> Result<(), StoreError> {
        Ok(scans::release_credits(&self.pool, scan_id, amount).await?)
    }

    async fn list_questions(&self, scan_id: i64) -> Result<Vec<BatchScanQuestion>, StoreError> {
        Ok(questions::list_questions(&self.pool, scan_id).await?)
    }

    async fn list_iterations(
        &self,
        question_id: i64,
    ) -> Result<Vec<IterationRecord>, StoreError> {
        Ok(iterations::list_iterations(&self.pool, question_id).await?)
    }

    async fn insert_iteration(&self, iteration: &NewIteration) -> Result<bool, StoreError> {
        Ok(iterations::insert_iteration(&self.pool, iteration).await?)
    }

    async fn update_question(
        &self,
        question_id: i64,
        status: QuestionStatus,
        rollup: &QuestionRollup,
    ) -> Result<(), StoreError> {
        Ok(questions::update_question(&self.pool, question_id, status, rollup).await?)
    }

    async fn record_question_error(
        &self,
        question_id: i64,
        message: &str,
    ) -> Result<(), StoreError> {
        Ok(questions::record_question_error(&self.pool, question_id, message).await?)
    }

    async fn update_scan_progress(
        &self,
        scan_id: i64,
        completed_questions: i32,
        completed_iterations: i32,
        overall_exposure_rate: Option<f64>,
    ) -> Result<(), StoreError> {
        Ok(scans::update_scan_progress(
            &self.pool,
            scan_id,
            completed_questions,
            completed_iterations,
            overall_exposure_rate,
        )
        .await?)
    }
}
