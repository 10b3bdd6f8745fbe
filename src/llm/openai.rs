//! OpenAI-compatible chat completions client.
//!
//! Serves both the public OpenAI API (bearer auth, `{base}/chat/completions`)
//! and Azure OpenAI deployments (`api-key` header,
//! `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=`).
//! Pure request building and response parsing live in free functions for
//! testability.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::config::{AzureDeployment, LlmTimeouts};
use super::types::{ChatResponse, LlmError, Message};

// =============================================================================
// CLIENT
// =============================================================================

enum Target {
    OpenAi { base_url: String },
    Azure(AzureDeployment),
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: SecretString,
    target: Target,
}

impl OpenAiClient {
    /// Client for the public OpenAI API or any compatible endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(api_key: SecretString, base_url: &str, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self {
            http: build_http(timeouts)?,
            api_key,
            target: Target::OpenAi { base_url: base_url.trim_end_matches('/').to_string() },
        })
    }

    /// Client for an Azure OpenAI deployment.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn azure(api_key: SecretString, deployment: AzureDeployment, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        Ok(Self { http: build_http(timeouts)?, api_key, target: Target::Azure(deployment) })
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<ChatResponse, LlmError> {
        let body = CcRequest { model, messages, temperature, max_tokens };
        let request = match &self.target {
            Target::OpenAi { base_url } => self
                .http
                .post(format!("{base_url}/chat/completions"))
                .bearer_auth(self.api_key.expose_secret()),
            Target::Azure(deployment) => self
                .http
                .post(azure_chat_url(deployment))
                .header("api-key", self.api_key.expose_secret()),
        };

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;
        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }
        parse_chat_completions_response(&text, model)
    }
}

fn build_http(timeouts: LlmTimeouts) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| LlmError::HttpClientBuild(e.to_string()))
}

pub(crate) fn azure_chat_url(deployment: &AzureDeployment) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        deployment.endpoint, deployment.deployment, deployment.api_version
    )
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CcResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<CcChoice>,
    #[serde(default)]
    usage: Option<CcUsage>,
}

#[derive(Deserialize)]
struct CcChoice {
    message: CcChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CcChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CcUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_chat_completions_response(json: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let api: CcResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let choice = api
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ApiParse("response contained no choices".into()))?;
    let usage = api.usage.unwrap_or(CcUsage { prompt_tokens: 0, completion_tokens: 0 });

    Ok(ChatResponse {
        text: choice.message.content.unwrap_or_default(),
        model: api.model.unwrap_or_else(|| requested_model.to_string()),
        stop_reason: choice.finish_reason.unwrap_or_else(|| "unknown".into()),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
