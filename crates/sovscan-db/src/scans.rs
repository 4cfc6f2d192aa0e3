//! Database operations for the `batch_scans` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use sovscan_core::{
    BatchScan, NewScan, PauseReason, QuestionRollup, ScanStatus, SettingsSnapshot,
};

use crate::DbError;

const SCAN_COLUMNS: &str = "id, public_id, user_id, brand_name, question_set, status, \
     pause_reason, pause_requested, total_questions, completed_questions, \
     total_iterations, completed_iterations, estimated_credits, used_credits, \
     overall_exposure_rate, resume_attempts, settings, started_at, paused_at, \
     resumed_at, completed_at, created_at";

/// A row from the `batch_scans` table. Status strings are parsed into their
/// domain enums by [`ScanRow::into_scan`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub brand_name: String,
    pub question_set: String,
    pub status: String,
    pub pause_reason: Option<String>,
    pub pause_requested: bool,
    pub total_questions: i32,
    pub completed_questions: i32,
    pub total_iterations: i32,
    pub completed_iterations: i32,
    pub estimated_credits: i64,
    pub used_credits: i64,
    pub overall_exposure_rate: Option<f64>,
    pub resume_attempts: i32,
    pub settings: Json<SettingsSnapshot>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScanRow {
    /// Convert into the domain type, parsing stored status strings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a status string does not parse.
    pub fn into_scan(self) -> Result<BatchScan, DbError> {
        let status = ScanStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown scan status '{}'", self.status)))?;
        let pause_reason = self
            .pause_reason
            .map(|r| {
                PauseReason::parse(&r)
                    .ok_or_else(|| DbError::Decode(format!("unknown pause reason '{r}'")))
            })
            .transpose()?;

        Ok(BatchScan {
            id: self.id,
            public_id: self.public_id,
            user_id: self.user_id,
            brand_name: self.brand_name,
            question_set: self.question_set,
            status,
            pause_reason,
            pause_requested: self.pause_requested,
            total_questions: self.total_questions,
            completed_questions: self.completed_questions,
            total_iterations: self.total_iterations,
            completed_iterations: self.completed_iterations,
            estimated_credits: self.estimated_credits,
            used_credits: self.used_credits,
            overall_exposure_rate: self.overall_exposure_rate,
            resume_attempts: self.resume_attempts,
            settings: self.settings.0,
            started_at: self.started_at,
            paused_at: self.paused_at,
            resumed_at: self.resumed_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

/// Inserts a scan in `pending` status plus its question rows, in one
/// transaction. Returns the newly created scan.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn create_scan(
    pool: &PgPool,
    scan: &NewScan,
    questions: &[String],
) -> Result<BatchScan, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ScanRow>(&format!(
        "INSERT INTO batch_scans \
             (public_id, user_id, brand_name, question_set, \
              total_questions, total_iterations, estimated_credits, settings) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {SCAN_COLUMNS}"
    ))
    .bind(scan.public_id)
    .bind(scan.user_id)
    .bind(&scan.brand_name)
    .bind(&scan.question_set)
    .bind(scan.total_questions)
    .bind(scan.total_iterations)
    .bind(scan.estimated_credits)
    .bind(Json(&scan.settings))
    .fetch_one(&mut *tx)
    .await?;

    for (index, text) in questions.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let order_index = index as i32;
        sqlx::query(
            "INSERT INTO batch_scan_questions (scan_id, question_text, order_index, rollup) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(row.id)
        .bind(text)
        .bind(order_index)
        .bind(Json(QuestionRollup::default()))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    row.into_scan()
}

/// Fetches a scan by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`.
pub async fn get_scan(pool: &PgPool, id: i64) -> Result<BatchScan, DbError> {
    let row = sqlx::query_as::<_, ScanRow>(&format!(
        "SELECT {SCAN_COLUMNS} FROM batch_scans WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.into_scan()
}

/// Fetches a scan by its external `public_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `public_id`.
pub async fn get_scan_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<BatchScan, DbError> {
    let row = sqlx::query_as::<_, ScanRow>(&format!(
        "SELECT {SCAN_COLUMNS} FROM batch_scans WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.into_scan()
}

/// Returns the most recent `limit` scans, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_scans(pool: &PgPool, limit: i64) -> Result<Vec<BatchScan>, DbError> {
    let rows = sqlx::query_as::<_, ScanRow>(&format!(
        "SELECT {SCAN_COLUMNS} FROM batch_scans \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ScanRow::into_scan).collect()
}

/// Guarded transition to `running`.
///
/// From `pending` the transition stamps `started_at`; from `paused` it stamps
/// `resumed_at` and clears `pause_reason` and any pending pause request.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is not in `from`.
pub async fn mark_scan_running(pool: &PgPool, id: i64, from: ScanStatus) -> Result<(), DbError> {
    let result = match from {
        ScanStatus::Pending => {
            sqlx::query(
                "UPDATE batch_scans \
                 SET status = 'running', started_at = NOW() \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(id)
            .execute(pool)
            .await?
        }
        ScanStatus::Paused => {
            sqlx::query(
                "UPDATE batch_scans \
                 SET status = 'running', resumed_at = NOW(), \
                     pause_reason = NULL, pause_requested = FALSE \
                 WHERE id = $1 AND status = 'paused'",
            )
            .bind(id)
            .execute(pool)
            .await?
        }
        _ => {
            return Err(DbError::InvalidScanTransition {
                id,
                expected_status: "pending or paused",
            })
        }
    };

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: from.as_str(),
        });
    }

    Ok(())
}

/// Marks a running scan as `paused`, recording `reason` and `paused_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is not `running`.
pub async fn mark_scan_paused(pool: &PgPool, id: i64, reason: PauseReason) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans \
         SET status = 'paused', pause_reason = $1, pause_requested = FALSE, paused_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(reason.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running scan as `completed` with its final exposure rate.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is not `running`.
pub async fn mark_scan_completed(
    pool: &PgPool,
    id: i64,
    overall_exposure_rate: f64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans \
         SET status = 'completed', overall_exposure_rate = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(overall_exposure_rate)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a non-terminal scan as `failed`, keeping the last known pause
/// reason when no new one is supplied.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is already terminal.
pub async fn mark_scan_failed(
    pool: &PgPool,
    id: i64,
    reason: Option<PauseReason>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans \
         SET status = 'failed', pause_reason = COALESCE($1, pause_reason), \
             completed_at = NOW() \
         WHERE id = $2 AND status IN ('pending', 'running', 'paused')",
    )
    .bind(reason.map(PauseReason::as_str))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: "pending, running or paused",
        });
    }

    Ok(())
}

/// Sets or clears the persisted pause-request flag.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the scan does not exist.
pub async fn set_pause_requested(pool: &PgPool, id: i64, requested: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE batch_scans SET pause_requested = $1 WHERE id = $2")
        .bind(requested)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Atomically increments `resume_attempts` and returns the new value.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the scan does not exist.
pub async fn increment_resume_attempts(pool: &PgPool, id: i64) -> Result<i32, DbError> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE batch_scans SET resume_attempts = resume_attempts + 1 \
         WHERE id = $1 RETURNING resume_attempts",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Compare-and-increment reserve against the scan's credit estimate.
///
/// Returns `true` iff the charge fit within `estimated_credits`; the check
/// and the increment are a single guarded UPDATE, so concurrent reservations
/// can never overspend.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reserve_credits(pool: &PgPool, id: i64, amount: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans SET used_credits = used_credits + $1 \
         WHERE id = $2 AND used_credits + $1 <= estimated_credits",
    )
    .bind(amount)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns a previously reserved charge, floored at zero.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the scan does not exist.
pub async fn release_credits(pool: &PgPool, id: i64, amount: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans SET used_credits = GREATEST(used_credits - $1, 0) WHERE id = $2",
    )
    .bind(amount)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Overwrites the scan's derived progress counters and overall rate.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the scan does not exist.
pub async fn update_scan_progress(
    pool: &PgPool,
    id: i64,
    completed_questions: i32,
    completed_iterations: i32,
    overall_exposure_rate: Option<f64>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scans \
         SET completed_questions = $1, completed_iterations = $2, overall_exposure_rate = $3 \
         WHERE id = $4",
    )
    .bind(completed_questions)
    .bind(completed_iterations)
    .bind(overall_exposure_rate)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
