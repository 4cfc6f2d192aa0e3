//! Request/response shapes shared by all provider clients.

use serde::{Deserialize, Serialize};
use sovscan_core::Provider;

use crate::ProviderError;

/// One turn of the conversation submitted to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call knobs, taken from the scan's settings snapshot.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Hard deadline for the whole HTTP exchange.
    pub timeout_secs: u64,
}

/// Token usage counters as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A successful provider answer.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub provider: Provider,
    pub model: String,
    /// Source URLs the provider attached to the answer, when its API exposes
    /// them (currently Perplexity).
    pub citations: Vec<String>,
}

/// The flat completion capability the engine consumes.
///
/// Implemented by [`crate::ProviderRegistry`] in production and by scripted
/// fakes in engine tests.
#[allow(async_fn_in_trait)]
pub trait CompletionApi {
    async fn complete(
        &self,
        provider: Provider,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError>;
}
