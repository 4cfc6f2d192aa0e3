//! Client for the Anthropic messages API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use sovscan_core::Provider;

use crate::error::check_status;
use crate::types::{ChatMessage, Completion, CompletionOptions, TokenUsage};
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic messages endpoint.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicClient {
    /// Creates a new client pointed at the production Anthropic API.
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

    /// Submit a conversation and return the concatenated text blocks.
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
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
        let parsed: MessagesResponse =
            serde_json::from_value(raw).map_err(|e| ProviderError::Deserialize {
                context: format!("anthropic messages (model={})", options.model),
                source: e,
            })?;

        let text = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        Ok(Completion {
            text,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
            },
            provider: Provider::Anthropic,
            model: parsed.model,
            citations: Vec::new(),
        })
    }
}
