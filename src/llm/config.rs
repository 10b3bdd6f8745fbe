//! LLM configuration parsed from environment variables.

use secrecy::SecretString;

use super::types::LlmError;
use crate::config::parse_var;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Anthropic,
    OpenAi,
    Azure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Azure OpenAI addressing: requests go to a named deployment, not a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureDeployment {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

#[derive(Debug)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub azure: Option<AzureDeployment>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Optional:
    /// - `LLM_PROVIDER`: `anthropic`, `openai` or `azure`; defaults to `azure`
    ///   when `AZURE_OPENAI_ENDPOINT` is set, else `anthropic`
    /// - `LLM_API_KEY_ENV`: names the env var holding the key (provider default
    ///   `ANTHROPIC_API_KEY`, `OPENAI_API_KEY` or `AZURE_OPENAI_API_KEY`)
    /// - `LLM_MODEL`: model, or deployment name for Azure
    ///   (`AZURE_OPENAI_DEPLOYMENT_NAME` also accepted)
    /// - `LLM_BASE_URL`: override the provider base URL
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_VERSION`
    /// - `LLM_TEMPERATURE` (0..=2), `LLM_MAX_TOKENS`, `LLM_MAX_RETRIES`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no key is available and
    /// [`LlmError::ConfigParse`] for malformed values.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LlmConfig::from_env`] with an explicit key lookup.
    ///
    /// # Errors
    ///
    /// See [`LlmConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let azure_endpoint = get("AZURE_OPENAI_ENDPOINT");
        let provider = parse_provider(get("LLM_PROVIDER").as_deref(), azure_endpoint.is_some())?;

        let key_var = get("LLM_API_KEY_ENV").unwrap_or_else(|| default_key_var(provider).to_string());
        let api_key = get(key_var.as_str()).ok_or_else(|| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = get("LLM_MODEL")
            .or_else(|| if provider == LlmProviderKind::Azure { get("AZURE_OPENAI_DEPLOYMENT_NAME") } else { None })
            .unwrap_or_else(|| default_model(provider).to_string());

        let azure = match provider {
            LlmProviderKind::Azure => {
                let endpoint = azure_endpoint.ok_or_else(|| {
                    LlmError::ConfigParse("AZURE_OPENAI_ENDPOINT is required for the azure provider".into())
                })?;
                Some(AzureDeployment {
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    deployment: model.clone(),
                    api_version: get("AZURE_OPENAI_API_VERSION").unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.into()),
                })
            }
            _ => None,
        };

        let base_url = get("LLM_BASE_URL")
            .unwrap_or_else(|| default_base_url(provider).to_string())
            .trim_end_matches('/')
            .to_string();

        let temperature = parse(&lookup, "LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(LlmError::ConfigParse(format!("LLM_TEMPERATURE must be within 0..=2, got {temperature}")));
        }

        let timeouts = LlmTimeouts {
            request_secs: parse(&lookup, "LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse(&lookup, "LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self {
            provider,
            api_key: SecretString::new(api_key),
            model,
            base_url,
            azure,
            temperature,
            max_tokens: parse(&lookup, "LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            max_retries: parse(&lookup, "LLM_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            timeouts,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, LlmError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_var(lookup, key, default).map_err(|e| LlmError::ConfigParse(e.to_string()))
}

fn parse_provider(raw: Option<&str>, azure_endpoint_set: bool) -> Result<LlmProviderKind, LlmError> {
    let fallback = if azure_endpoint_set { "azure" } else { "anthropic" };
    match raw.unwrap_or(fallback).to_ascii_lowercase().as_str() {
        "anthropic" => Ok(LlmProviderKind::Anthropic),
        "openai" => Ok(LlmProviderKind::OpenAi),
        "azure" | "azure_openai" => Ok(LlmProviderKind::Azure),
        other => Err(LlmError::ConfigParse(format!("unknown LLM_PROVIDER: {other}"))),
    }
}

fn default_key_var(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        LlmProviderKind::OpenAi => "OPENAI_API_KEY",
        LlmProviderKind::Azure => "AZURE_OPENAI_API_KEY",
    }
}

fn default_model(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Anthropic => "claude-sonnet-4-5-20250929",
        LlmProviderKind::OpenAi | LlmProviderKind::Azure => "gpt-4o",
    }
}

fn default_base_url(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Anthropic => DEFAULT_ANTHROPIC_BASE_URL,
        LlmProviderKind::OpenAi | LlmProviderKind::Azure => DEFAULT_OPENAI_BASE_URL,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
