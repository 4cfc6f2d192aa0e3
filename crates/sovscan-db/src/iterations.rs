//! Database operations for the `scan_iterations` table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use sovscan_core::{IterationRecord, IterationStatus, NewIteration, Provider, Sentiment};

use crate::DbError;

const ITERATION_COLUMNS: &str = "id, question_id, provider, iteration_index, status, \
     response_text, brand_mentioned, mention_position, sentiment, competitor_mentions, \
     citations, latency_ms, error_message, created_at";

/// A row from the `scan_iterations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IterationRow {
    pub id: i64,
    pub question_id: i64,
    pub provider: String,
    pub iteration_index: i32,
    pub status: String,
    pub response_text: Option<String>,
    pub brand_mentioned: Option<bool>,
    pub mention_position: Option<i32>,
    pub sentiment: Option<String>,
    pub competitor_mentions: Json<BTreeMap<String, u32>>,
    pub citations: Vec<String>,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IterationRow {
    /// Convert into the domain type, parsing stored enum strings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if any stored enum string does not parse.
    pub fn into_record(self) -> Result<IterationRecord, DbError> {
        let provider = Provider::parse(&self.provider)
            .ok_or_else(|| DbError::Decode(format!("unknown provider '{}'", self.provider)))?;
        let status = IterationStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown iteration status '{}'", self.status))
        })?;
        let sentiment = self
            .sentiment
            .map(|s| {
                Sentiment::parse(&s)
                    .ok_or_else(|| DbError::Decode(format!("unknown sentiment '{s}'")))
            })
            .transpose()?;

        Ok(IterationRecord {
            id: self.id,
            question_id: self.question_id,
            provider,
            iteration_index: self.iteration_index,
            status,
            response_text: self.response_text,
            brand_mentioned: self.brand_mentioned,
            mention_position: self.mention_position,
            sentiment,
            competitor_mentions: self.competitor_mentions.0,
            citations: self.citations,
            latency_ms: self.latency_ms,
            error_message: self.error_message,
            created_at: self.created_at,
        })
    }
}

/// Returns every iteration row of a question.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_iterations(
    pool: &PgPool,
    question_id: i64,
) -> Result<Vec<IterationRecord>, DbError> {
    let rows = sqlx::query_as::<_, IterationRow>(&format!(
        "SELECT {ITERATION_COLUMNS} FROM scan_iterations \
         WHERE question_id = $1 \
         ORDER BY provider, iteration_index",
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(IterationRow::into_record).collect()
}

/// Inserts a terminal iteration row, keyed by `(question_id, provider,
/// iteration_index)`.
///
/// Returns `false` when a row with the same key already exists; the insert
/// is `ON CONFLICT DO NOTHING`, so a raced duplicate is silently discarded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_iteration(pool: &PgPool, iteration: &NewIteration) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO scan_iterations \
             (question_id, provider, iteration_index, status, response_text, \
              brand_mentioned, mention_position, sentiment, competitor_mentions, \
              citations, latency_ms, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (question_id, provider, iteration_index) DO NOTHING",
    )
    .bind(iteration.question_id)
    .bind(iteration.provider.as_str())
    .bind(iteration.iteration_index)
    .bind(iteration.status.as_str())
    .bind(&iteration.response_text)
    .bind(iteration.brand_mentioned)
    .bind(iteration.mention_position)
    .bind(iteration.sentiment.map(Sentiment::as_str))
    .bind(Json(&iteration.competitor_mentions))
    .bind(&iteration.citations)
    .bind(iteration.latency_ms)
    .bind(&iteration.error_message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
