//! Client for the Perplexity chat completions API.
//!
//! Perplexity speaks the OpenAI chat-completions shape but additionally
//! returns a top-level `citations` array of source URLs, which feeds the
//! classifier's citation extraction.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use sovscan_core::Provider;

use crate::error::check_status;
use crate::types::{ChatMessage, Completion, CompletionOptions, TokenUsage};
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Client for the Perplexity chat completions endpoint.
pub struct PerplexityClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
    model: String,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl PerplexityClient {
    /// Creates a new client pointed at the production Perplexity API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Network`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Network`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sovscan/0.1 (brand-visibility)")
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Submit a conversation and return the first choice's text plus any
    /// structured citations.
    ///
    /// # Errors
    ///
    /// Same classification as [`crate::OpenAiClient::complete`].
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let body = serde_json::json!({
            "model": options.model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(options.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let response = check_status(response).await?;

        let raw = response
            .json::<serde_json::Value>()
            .await
            .map_err(ProviderError::from_transport)?;
        let parsed: ChatResponse =
            serde_json::from_value(raw).map_err(|e| ProviderError::Deserialize {
                context: format!("perplexity chat completion (model={})", options.model),
                source: e,
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
            },
            provider: Provider::Perplexity,
            model: parsed.model,
            citations: parsed.citations,
        })
    }
}
