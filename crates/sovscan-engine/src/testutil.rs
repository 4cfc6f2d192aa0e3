//! In-memory test doubles: a `ScanStore` with the same atomicity semantics
//! as the Postgres implementation, and a scripted `CompletionApi`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use sovscan_core::{
    BatchScan, BatchScanQuestion, IterationRecord, NewIteration, NewScan, PauseReason, Provider,
    QuestionRollup, QuestionStatus, ScanStatus, ScanStore, StoreError,
};
use sovscan_providers::{
    ChatMessage, Completion, CompletionApi, CompletionOptions, ProviderError, TokenUsage,
};

#[derive(Default)]
struct Inner {
    scans: HashMap<i64, BatchScan>,
    questions: HashMap<i64, BatchScanQuestion>,
    iterations: Vec<IterationRecord>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn scan_mut(&mut self, scan_id: i64) -> Result<&mut BatchScan, StoreError> {
        self.scans.get_mut(&scan_id).ok_or(StoreError::NotFound)
    }
}

/// Mirror of `PgScanStore` semantics over a `Mutex<HashMap>`: guarded
/// transitions, compare-and-increment credit reserve, insert-once
/// iterations.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Test hook: shrink a scan's budget after creation.
    pub(crate) fn set_estimated_credits(&self, scan_id: i64, estimated: i64) {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(scan) = inner.scans.get_mut(&scan_id) {
            scan.estimated_credits = estimated;
        }
    }

    pub(crate) fn all_iterations(&self) -> Vec<IterationRecord> {
        self.inner.lock().expect("store lock").iterations.clone()
    }
}

impl ScanStore for MemoryStore {
    async fn get_scan(&self, scan_id: i64) -> Result<BatchScan, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        inner.scans.get(&scan_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_scan_by_public_id(&self, public_id: Uuid) -> Result<BatchScan, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .scans
            .values()
            .find(|s| s.public_id == public_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_scan(
        &self,
        scan: &NewScan,
        questions: &[String],
    ) -> Result<BatchScan, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let id = inner.next_id();
        let stored = BatchScan {
            id,
            public_id: scan.public_id,
            user_id: scan.user_id,
            brand_name: scan.brand_name.clone(),
            question_set: scan.question_set.clone(),
            status: ScanStatus::Pending,
            pause_reason: None,
            pause_requested: false,
            total_questions: scan.total_questions,
            completed_questions: 0,
            total_iterations: scan.total_iterations,
            completed_iterations: 0,
            estimated_credits: scan.estimated_credits,
            used_credits: 0,
            overall_exposure_rate: None,
            resume_attempts: 0,
            settings: scan.settings.clone(),
            started_at: None,
            paused_at: None,
            resumed_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        inner.scans.insert(id, stored.clone());

        for (index, text) in questions.iter().enumerate() {
            let question_id = inner.next_id();
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let order_index = index as i32;
            inner.questions.insert(
                question_id,
                BatchScanQuestion {
                    id: question_id,
                    scan_id: id,
                    question_text: text.clone(),
                    order_index,
                    status: QuestionStatus::Pending,
                    rollup: QuestionRollup::default(),
                    last_error: None,
                    retry_count: 0,
                    created_at: Utc::now(),
                },
            );
        }
        Ok(stored)
    }

    async fn mark_scan_running(&self, scan_id: i64, from: ScanStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        if scan.status != from {
            return Err(StoreError::InvalidTransition {
                id: scan_id,
                expected: from.as_str(),
            });
        }
        scan.status = ScanStatus::Running;
        match from {
            ScanStatus::Pending => scan.started_at = Some(Utc::now()),
            ScanStatus::Paused => {
                scan.resumed_at = Some(Utc::now());
                scan.pause_reason = None;
                scan.pause_requested = false;
            }
            _ => {}
        }
        Ok(())
    }

    async fn mark_scan_paused(
        &self,
        scan_id: i64,
        reason: PauseReason,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        if scan.status != ScanStatus::Running {
            return Err(StoreError::InvalidTransition {
                id: scan_id,
                expected: "running",
            });
        }
        scan.status = ScanStatus::Paused;
        scan.pause_reason = Some(reason);
        scan.pause_requested = false;
        scan.paused_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_scan_completed(
        &self,
        scan_id: i64,
        overall_exposure_rate: f64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        if scan.status != ScanStatus::Running {
            return Err(StoreError::InvalidTransition {
                id: scan_id,
                expected: "running",
            });
        }
        scan.status = ScanStatus::Completed;
        scan.overall_exposure_rate = Some(overall_exposure_rate);
        scan.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_scan_failed(
        &self,
        scan_id: i64,
        reason: Option<PauseReason>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        if scan.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id: scan_id,
                expected: "running or paused",
            });
        }
        scan.status = ScanStatus::Failed;
        if reason.is_some() {
            scan.pause_reason = reason;
        }
        Ok(())
    }

    async fn set_pause_requested(
        &self,
        scan_id: i64,
        requested: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        inner.scan_mut(scan_id)?.pause_requested = requested;
        Ok(())
    }

    async fn increment_resume_attempts(&self, scan_id: i64) -> Result<i32, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        scan.resume_attempts += 1;
        Ok(scan.resume_attempts)
    }

    async fn reserve_credits(&self, scan_id: i64, amount: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        if scan.used_credits + amount <= scan.estimated_credits {
            scan.used_credits += amount;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release_credits(&self, scan_id: i64, amount: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        scan.used_credits = (scan.used_credits - amount).max(0);
        Ok(())
    }

    async fn list_questions(&self, scan_id: i64) -> Result<Vec<BatchScanQuestion>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let mut questions: Vec<_> = inner
            .questions
            .values()
            .filter(|q| q.scan_id == scan_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn list_iterations(
        &self,
        question_id: i64,
    ) -> Result<Vec<IterationRecord>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .iterations
            .iter()
            .filter(|it| it.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn insert_iteration(&self, iteration: &NewIteration) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let exists = inner.iterations.iter().any(|it| {
            it.question_id == iteration.question_id
                && it.provider == iteration.provider
                && it.iteration_index == iteration.iteration_index
        });
        if exists {
            return Ok(false);
        }
        let id = inner.next_id();
        inner.iterations.push(IterationRecord {
            id,
            question_id: iteration.question_id,
            provider: iteration.provider,
            iteration_index: iteration.iteration_index,
            status: iteration.status,
            response_text: iteration.response_text.clone(),
            brand_mentioned: iteration.brand_mentioned,
            mention_position: iteration.mention_position,
            sentiment: iteration.sentiment,
            competitor_mentions: iteration.competitor_mentions.clone(),
            citations: iteration.citations.clone(),
            latency_ms: iteration.latency_ms,
            error_message: iteration.error_message.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn update_question(
        &self,
        question_id: i64,
        status: QuestionStatus,
        rollup: &QuestionRollup,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let question = inner
            .questions
            .get_mut(&question_id)
            .ok_or(StoreError::NotFound)?;
        question.status = status;
        question.rollup = rollup.clone();
        Ok(())
    }

    async fn record_question_error(
        &self,
        question_id: i64,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let question = inner
            .questions
            .get_mut(&question_id)
            .ok_or(StoreError::NotFound)?;
        question.last_error = Some(message.to_string());
        question.retry_count += 1;
        Ok(())
    }

    async fn update_scan_progress(
        &self,
        scan_id: i64,
        completed_questions: i32,
        completed_iterations: i32,
        overall_exposure_rate: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let scan = inner.scan_mut(scan_id)?;
        scan.completed_questions = completed_questions;
        scan.completed_iterations = completed_iterations;
        scan.overall_exposure_rate = overall_exposure_rate;
        Ok(())
    }
}

/// One scripted step for a provider.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedResponse {
    Text(&'static str),
    RateLimited,
    AuthFailed,
    Timeout,
    ServerError,
    NotConfigured,
}

/// A `CompletionApi` that replays scripted responses per provider and falls
/// back to a default answer when the script runs dry.
pub(crate) struct ScriptedApi {
    scripts: Mutex<HashMap<Provider, VecDeque<ScriptedResponse>>>,
    default_text: String,
    calls: AtomicU32,
}

impl ScriptedApi {
    pub(crate) fn new(default_text: &str) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_text: default_text.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn script(&self, provider: Provider, steps: Vec<ScriptedResponse>) {
        let mut scripts = self.scripts.lock().expect("script lock");
        scripts.entry(provider).or_default().extend(steps);
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionApi for ScriptedApi {
    async fn complete(
        &self,
        provider: Provider,
        _messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut scripts = self.scripts.lock().expect("script lock");
            scripts.get_mut(&provider).and_then(VecDeque::pop_front)
        };
        let text = match step {
            None => self.default_text.clone(),
            Some(ScriptedResponse::Text(t)) => t.to_string(),
            Some(ScriptedResponse::RateLimited) => {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: None,
                })
            }
            Some(ScriptedResponse::AuthFailed) => {
                return Err(ProviderError::AuthFailed { status: 401 })
            }
            Some(ScriptedResponse::Timeout) => return Err(ProviderError::Timeout),
            Some(ScriptedResponse::ServerError) => {
                return Err(ProviderError::Upstream {
                    status: 503,
                    message: "upstream unavailable".to_string(),
                })
            }
            Some(ScriptedResponse::NotConfigured) => {
                return Err(ProviderError::NotConfigured(provider))
            }
        };
        Ok(Completion {
            text,
            usage: TokenUsage::default(),
            provider,
            model: options.model.clone(),
            citations: Vec::new(),
        })
    }
}

impl CompletionApi for &ScriptedApi {
    async fn complete(
        &self,
        provider: Provider,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        (**self).complete(provider, messages, options).await
    }
}

/// Insert a pending scan built from `definition` directly into `store`.
pub(crate) async fn seed_scan(
    store: &MemoryStore,
    definition: &sovscan_core::ScanDefinition,
) -> BatchScan {
    let snapshot = definition.snapshot();
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let total_questions = definition.questions.len() as i32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let total_iterations = total_questions * snapshot.iterations_per_question() as i32;
    #[allow(clippy::cast_possible_truncation)]
    let estimated_credits = snapshot.estimated_credits(definition.questions.len() as u32);
    store
        .create_scan(
            &NewScan {
                public_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                brand_name: definition.brand_name.clone(),
                question_set: definition.name.clone(),
                total_questions,
                total_iterations,
                estimated_credits,
                settings: snapshot,
            },
            &definition.questions,
        )
        .await
        .expect("seed scan")
}

/// Build a validated scan definition for tests.
pub(crate) fn definition(
    providers: &[(Provider, u32, i64)],
    questions: &[&str],
) -> sovscan_core::ScanDefinition {
    let providers: BTreeMap<_, _> = providers
        .iter()
        .map(|&(provider, iterations, credit_cost)| {
            (
                provider,
                sovscan_core::ProviderSettings {
                    model: format!("{provider}-test-model"),
                    iterations,
                    credit_cost,
                },
            )
        })
        .collect();
    let definition = sovscan_core::ScanDefinition {
        name: "test-set".to_string(),
        brand_name: "Acme Cola".to_string(),
        brand_keywords: vec!["acme".to_string()],
        competitors: vec!["Brand X".to_string()],
        providers,
        timeout_secs: 5,
        temperature: 0.7,
        max_tokens: 256,
        questions: questions.iter().map(ToString::to_string).collect(),
    };
    definition.validate().expect("test definition is valid");
    definition
}

/// Engine config tuned for fast tests: serial dispatch, millisecond backoff.
pub(crate) fn test_config() -> crate::EngineConfig {
    crate::EngineConfig {
        max_concurrency: 1,
        max_attempts: 3,
        retry_backoff_base_ms: 1,
        max_resume_attempts: 5,
        network_pause_threshold: 5,
    }
}
