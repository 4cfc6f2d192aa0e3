//! Database operations for the `batch_scan_questions` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use sovscan_core::{BatchScanQuestion, QuestionRollup, QuestionStatus};

use crate::DbError;

const QUESTION_COLUMNS: &str = "id, scan_id, question_text, order_index, status, rollup, \
     last_error, retry_count, created_at";

/// A row from the `batch_scan_questions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub scan_id: i64,
    pub question_text: String,
    pub order_index: i32,
    pub status: String,
    pub rollup: Json<QuestionRollup>,
    pub last_error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl QuestionRow {
    /// Convert into the domain type, parsing the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the status string does not parse.
    pub fn into_question(self) -> Result<BatchScanQuestion, DbError> {
        let status = QuestionStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown question status '{}'", self.status))
        })?;

        Ok(BatchScanQuestion {
            id: self.id,
            scan_id: self.scan_id,
            question_text: self.question_text,
            order_index: self.order_index,
            status,
            rollup: self.rollup.0,
            last_error: self.last_error,
            retry_count: self.retry_count,
            created_at: self.created_at,
        })
    }
}

/// Returns a scan's questions in `order_index` order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_questions(pool: &PgPool, scan_id: i64) -> Result<Vec<BatchScanQuestion>, DbError> {
    let rows = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM batch_scan_questions \
         WHERE scan_id = $1 \
         ORDER BY order_index",
    ))
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(QuestionRow::into_question).collect()
}

/// Overwrites a question's status and rollup.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the question does not exist.
pub async fn update_question(
    pool: &PgPool,
    id: i64,
    status: QuestionStatus,
    rollup: &QuestionRollup,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scan_questions SET status = $1, rollup = $2 WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(Json(rollup))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Records a per-question error: sets `last_error` and bumps `retry_count`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the question does not exist.
pub async fn record_question_error(pool: &PgPool, id: i64, message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_scan_questions \
         SET last_error = $1, retry_count = retry_count + 1 \
         WHERE id = $2",
    )
    .bind(message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
