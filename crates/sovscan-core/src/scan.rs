//! Batch-scan domain types.
//!
//! A [`BatchScan`] is one measurement run for one brand against one question
//! set. It owns its [`BatchScanQuestion`] rows, which in turn own their
//! [`IterationRecord`] rows: one row per atomic provider call, keyed by
//! `(question_id, provider, iteration_index)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::SettingsSnapshot;

/// Lifecycle state of a batch scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl ScanStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Paused => "paused",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ScanStatus::Pending),
            "running" => Some(ScanStatus::Running),
            "paused" => Some(ScanStatus::Paused),
            "completed" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            _ => None,
        }
    }

    /// `completed` and `failed` admit no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scan is paused. Set iff `status == Paused`, retained on `Failed`
/// so the last blocking condition stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    NetworkError,
    InsufficientCredits,
    UserPaused,
    RateLimit,
    AuthError,
}

impl PauseReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PauseReason::NetworkError => "network_error",
            PauseReason::InsufficientCredits => "insufficient_credits",
            PauseReason::UserPaused => "user_paused",
            PauseReason::RateLimit => "rate_limit",
            PauseReason::AuthError => "auth_error",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "network_error" => Some(PauseReason::NetworkError),
            "insufficient_credits" => Some(PauseReason::InsufficientCredits),
            "user_paused" => Some(PauseReason::UserPaused),
            "rate_limit" => Some(PauseReason::RateLimit),
            "auth_error" => Some(PauseReason::AuthError),
            _ => None,
        }
    }
}

impl std::fmt::Display for PauseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported LLM completion providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Perplexity,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Perplexity => "perplexity",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "perplexity" => Some(Provider::Perplexity),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one question within a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl QuestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Pending => "pending",
            QuestionStatus::Running => "running",
            QuestionStatus::Completed => "completed",
            QuestionStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QuestionStatus::Pending),
            "running" => Some(QuestionStatus::Running),
            "completed" => Some(QuestionStatus::Completed),
            "failed" => Some(QuestionStatus::Failed),
            _ => None,
        }
    }
}

/// Terminal/non-terminal state of one provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    Pending,
    Success,
    Failed,
    Timeout,
}

impl IterationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IterationStatus::Pending => "pending",
            IterationStatus::Success => "success",
            IterationStatus::Failed => "failed",
            IterationStatus::Timeout => "timeout",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(IterationStatus::Pending),
            "success" => Some(IterationStatus::Success),
            "failed" => Some(IterationStatus::Failed),
            "timeout" => Some(IterationStatus::Timeout),
            _ => None,
        }
    }

    /// Terminal iterations count toward question completion; only `Success`
    /// rows enter exposure-rate denominators.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, IterationStatus::Pending)
    }
}

/// Sentiment classification of a provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// One measurement run for one brand against one question set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScan {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub brand_name: String,
    pub question_set: String,
    pub status: ScanStatus,
    pub pause_reason: Option<PauseReason>,
    /// Set by a user pause request; the dispatcher polls it between
    /// submissions so a pause survives process restarts.
    pub pause_requested: bool,
    pub total_questions: i32,
    pub completed_questions: i32,
    pub total_iterations: i32,
    pub completed_iterations: i32,
    pub estimated_credits: i64,
    pub used_credits: i64,
    pub overall_exposure_rate: Option<f64>,
    pub resume_attempts: i32,
    pub settings: SettingsSnapshot,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a scan in `pending` status.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub brand_name: String,
    pub question_set: String,
    pub total_questions: i32,
    pub total_iterations: i32,
    pub estimated_credits: i64,
    pub settings: SettingsSnapshot,
}

/// Per-provider slice of a question's rollup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    /// Terminal iterations (success + failed + timeout).
    pub completed: u32,
    /// Configured iteration count from the settings snapshot.
    pub total: u32,
    /// Iterations with status `success`, classified or not.
    pub succeeded: u32,
    /// Successful iterations with a classified `brand_mentioned`.
    pub classified: u32,
    /// Successful iterations where the brand was mentioned.
    pub mentions: u32,
    /// `mentions / classified`, absent until at least one classified
    /// iteration exists.
    pub exposure_rate: Option<f64>,
}

/// Sentiment tallies across a question's successful iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

/// Aggregated view of one question, recomputed idempotently from its
/// terminal iteration rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRollup {
    pub providers: BTreeMap<Provider, ProviderStats>,
    /// Mean of per-provider exposure rates; providers with zero classified
    /// iterations are excluded rather than counted as zero.
    pub avg_exposure_rate: Option<f64>,
    pub competitor_mentions: BTreeMap<String, u32>,
    pub sentiment: SentimentCounts,
}

/// One question's sub-run within a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScanQuestion {
    pub id: i64,
    pub scan_id: i64,
    pub question_text: String,
    pub order_index: i32,
    pub status: QuestionStatus,
    pub rollup: QuestionRollup,
    pub last_error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

/// One atomic provider call, keyed by `(question_id, provider,
/// iteration_index)`. Inserted once with a terminal status; never mutated
/// or re-dispatched afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub id: i64,
    pub question_id: i64,
    pub provider: Provider,
    pub iteration_index: i32,
    pub status: IterationStatus,
    pub response_text: Option<String>,
    pub brand_mentioned: Option<bool>,
    pub mention_position: Option<i32>,
    pub sentiment: Option<Sentiment>,
    pub competitor_mentions: BTreeMap<String, u32>,
    pub citations: Vec<String>,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a terminal iteration row.
#[derive(Debug, Clone)]
pub struct NewIteration {
    pub question_id: i64,
    pub provider: Provider,
    pub iteration_index: i32,
    pub status: IterationStatus,
    pub response_text: Option<String>,
    pub brand_mentioned: Option<bool>,
    pub mention_position: Option<i32>,
    pub sentiment: Option<Sentiment>,
    pub competitor_mentions: BTreeMap<String, u32>,
    pub citations: Vec<String>,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod tests;
