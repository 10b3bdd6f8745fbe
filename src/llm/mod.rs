//! Multi-provider LLM adapter for the content agents.
//!
//! DESIGN
//! ======
//! `LlmClient` dispatches to Anthropic, OpenAI, or an Azure OpenAI
//! deployment based on `LLM_PROVIDER`. It fills in default sampling
//! parameters and retries transient failures (transport errors, timeouts,
//! 429 and 5xx) with exponential backoff. Agents only see [`LlmChat`].

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod types;

use std::time::Duration;

use config::{LlmConfig, LlmProviderKind};
pub use types::LlmChat;
use types::{ChatRequest, ChatResponse, LlmError};

use crate::retry::{Backoff, retry_async};

const RETRY_BACKOFF: Backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30));

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to the configured provider.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

enum LlmProvider {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing, a value is malformed, or
    /// the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = match (config.provider, config.azure) {
            (LlmProviderKind::Anthropic, _) => LlmProvider::Anthropic(anthropic::AnthropicClient::new(
                config.api_key,
                &config.base_url,
                config.timeouts,
            )?),
            (LlmProviderKind::OpenAi, _) => {
                LlmProvider::OpenAi(openai::OpenAiClient::new(config.api_key, &config.base_url, config.timeouts)?)
            }
            (LlmProviderKind::Azure, Some(deployment)) => {
                LlmProvider::OpenAi(openai::OpenAiClient::azure(config.api_key, deployment, config.timeouts)?)
            }
            (LlmProviderKind::Azure, None) => {
                return Err(LlmError::ConfigParse("azure provider requires a deployment".into()));
            }
        };
        Ok(Self {
            inner,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let temperature = request.temperature.unwrap_or(self.temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.max_tokens);
        match &self.inner {
            LlmProvider::Anthropic(c) => c.chat(&self.model, request, temperature, max_tokens).await,
            LlmProvider::OpenAi(c) => {
                c.chat(&self.model, &request.messages, temperature, max_tokens)
                    .await
            }
        }
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let response = retry_async("llm.chat", self.max_retries, RETRY_BACKOFF, || self.chat_once(request)).await?;
        tracing::debug!(
            model = %response.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            stop_reason = %response.stop_reason,
            "llm chat completed"
        );
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
