//! Prompt assembly on top of [`LlmChat`].
//!
//! Every agent talks to the model through [`CompletionService`]: a system
//! instruction, optional retrieved context as a second system message, then
//! the user prompt. Structured calls ask for JSON and tolerate the model
//! wrapping it in a markdown fence.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::types::{ChatRequest, LlmError, Message};

pub const STRUCTURED_TEMPERATURE: f32 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("model returned an empty response")]
    Empty,
}

impl CompletionError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_timeout())
    }
}

impl ErrorCode for CompletionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Llm(e) => e.error_code(),
            Self::InvalidJson(_) => "E_LLM_INVALID_JSON",
            Self::Empty => "E_LLM_EMPTY",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            Self::InvalidJson(_) | Self::Empty => true,
        }
    }
}

/// Generated text plus the tokens the provider billed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens: u64,
}

#[derive(Clone)]
pub struct CompletionService {
    llm: Arc<dyn LlmChat>,
}

impl CompletionService {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>) -> Self {
        Self { llm }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// # Errors
    ///
    /// Returns [`CompletionError::Llm`] when the provider call fails and
    /// [`CompletionError::Empty`] when it answers with only whitespace.
    pub async fn generate_with_context(
        &self,
        prompt: &str,
        context: &str,
        system: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Completion, CompletionError> {
        let messages = build_messages(prompt, context, system);
        tracing::debug!(messages = messages.len(), context_chars = context.len(), "requesting completion");

        let mut request = ChatRequest::new(messages).temperature(temperature);
        if let Some(max_tokens) = max_tokens {
            request = request.max_tokens(max_tokens);
        }
        let response = self.llm.chat(&request).await?;
        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(CompletionError::Empty);
        }
        tracing::info!(tokens_used = response.total_tokens(), content_length = text.len(), "generated content");
        Ok(Completion { text, tokens: response.total_tokens() })
    }

    /// Ask for JSON shaped like `schema` and deserialize it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::InvalidJson`] when no candidate in the
    /// response parses as `T`.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &Value,
        context: &str,
    ) -> Result<(T, u64), CompletionError> {
        let system = structured_instruction(schema);
        let completion = self
            .generate_with_context(prompt, context, &system, STRUCTURED_TEMPERATURE, None)
            .await?;
        let value = extract_json(&completion.text)?;
        Ok((value, completion.tokens))
    }
}

pub(crate) fn build_messages(prompt: &str, context: &str, system: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(3);
    if !system.trim().is_empty() {
        messages.push(Message::system(system));
    }
    if !context.trim().is_empty() {
        messages.push(Message::system(format!(
            "Context:\n{context}\n\nBased on the above context, please respond to the following:"
        )));
    }
    messages.push(Message::user(prompt));
    messages
}

fn structured_instruction(schema: &Value) -> String {
    let schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "You are a helpful assistant that generates structured JSON output.\n\
         Always respond with valid JSON matching this schema:\n{schema}\n\n\
         Do not include any text outside the JSON object."
    )
}

/// Parse `T` from a model response: the raw text, else the first ```json
/// fenced block, else the first ``` fenced block.
///
/// # Errors
///
/// Returns [`CompletionError::InvalidJson`] when none of those parse.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, CompletionError> {
    let mut last_error = match serde_json::from_str(text.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    let fenced = fenced_block(text, "```json").or_else(|| fenced_block(text, "```"));
    if let Some(block) = fenced {
        match serde_json::from_str(block) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }

    let preview: String = text.chars().take(200).collect();
    tracing::error!(%preview, "failed to parse JSON from model response");
    Err(CompletionError::InvalidJson(last_error))
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

#[cfg(test)]
#[path = "completion_test.rs"]
mod tests;
