//! HTTP clients for the supported LLM completion providers.
//!
//! One small adapter struct per provider behind the flat [`CompletionApi`]
//! capability: submit a conversation, get back text plus usage counters,
//! bounded by a per-call timeout, with failures classified into the engine's
//! error taxonomy. The clients deliberately carry no retry logic; the
//! iteration executor owns retry policy.

mod anthropic;
mod error;
mod openai;
mod perplexity;
mod registry;
mod types;

pub use anthropic::AnthropicClient;
pub use error::ProviderError;
pub use openai::OpenAiClient;
pub use perplexity::PerplexityClient;
pub use registry::ProviderRegistry;
pub use types::{ChatMessage, Completion, CompletionApi, CompletionOptions, TokenUsage};
