//! Runtime dispatch over the configured provider clients.

use sovscan_core::Provider;

use crate::types::{ChatMessage, Completion, CompletionApi, CompletionOptions};
use crate::{AnthropicClient, OpenAiClient, PerplexityClient, ProviderError};

/// Holds one client per configured provider and dispatches on the
/// [`Provider`] enum. Providers without an API key are simply absent;
/// calling them yields [`ProviderError::NotConfigured`].
#[derive(Default)]
pub struct ProviderRegistry {
    openai: Option<OpenAiClient>,
    anthropic: Option<AnthropicClient>,
    perplexity: Option<PerplexityClient>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_openai(mut self, client: OpenAiClient) -> Self {
        self.openai = Some(client);
        self
    }

    #[must_use]
    pub fn with_anthropic(mut self, client: AnthropicClient) -> Self {
        self.anthropic = Some(client);
        self
    }

    #[must_use]
    pub fn with_perplexity(mut self, client: PerplexityClient) -> Self {
        self.perplexity = Some(client);
        self
    }

    /// `true` when a client is registered for `provider`.
    #[must_use]
    pub fn is_configured(&self, provider: Provider) -> bool {
        match provider {
            Provider::OpenAi => self.openai.is_some(),
            Provider::Anthropic => self.anthropic.is_some(),
            Provider::Perplexity => self.perplexity.is_some(),
        }
    }
}

impl CompletionApi for ProviderRegistry {
    async fn complete(
        &self,
        provider: Provider,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        match provider {
            Provider::OpenAi => {
                let client = self
                    .openai
                    .as_ref()
                    .ok_or(ProviderError::NotConfigured(provider))?;
                client.complete(messages, options).await
            }
            Provider::Anthropic => {
                let client = self
                    .anthropic
                    .as_ref()
                    .ok_or(ProviderError::NotConfigured(provider))?;
                client.complete(messages, options).await
            }
            Provider::Perplexity => {
                let client = self
                    .perplexity
                    .as_ref()
                    .ok_or(ProviderError::NotConfigured(provider))?;
                client.complete(messages, options).await
            }
        }
    }
}
