//! Application settings parsed from environment variables.
//!
//! DESIGN
//! ======
//! Settings load once at startup (after `.env` is applied by `dotenvy`).
//! Malformed values fail fast with [`ConfigError`]; absent values fall back
//! to defaults. Parsing goes through a lookup closure so tests can feed a
//! plain map instead of mutating the process environment.
//!
//! Integration sections (LLM, search, Graph) own their own typed configs and
//! reuse [`parse_var`] from here.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::models::CitationFormat;

pub const DEFAULT_APP_NAME: &str = "ContentForge";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
pub const DEFAULT_MAX_CONTENT_LENGTH: u32 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { key, message: message.into() }
    }
}

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(format!("expected development, staging or production, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("expected DEBUG, INFO, WARNING, ERROR or CRITICAL, got '{other}'")),
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: LogLevel,
    pub port: u16,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    /// Raw `AUTH_TOKENS` value; `None` disables the auth gate.
    pub auth_tokens: Option<SecretString>,
    pub max_content_length: u32,
    pub citation_format: CitationFormat,
    pub enable_fact_check: bool,
    pub templates_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_prefix = non_empty("API_V1_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());
        if !api_prefix.starts_with('/') || api_prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::invalid("API_V1_PREFIX", "must start with '/' and name a path"));
        }

        let max_content_length = parse_var(&lookup, "MAX_CONTENT_LENGTH", DEFAULT_MAX_CONTENT_LENGTH)?;
        if max_content_length == 0 {
            return Err(ConfigError::invalid("MAX_CONTENT_LENGTH", "must be positive"));
        }

        Ok(Self {
            app_name: non_empty("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_version: non_empty("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment: parse_var(&lookup, "ENVIRONMENT", Environment::Development)?,
            log_level: parse_var(&lookup, "LOG_LEVEL", LogLevel::Info)?,
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            cors_origins: split_origins(&lookup("BACKEND_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())),
            auth_tokens: non_empty("AUTH_TOKENS").map(SecretString::new),
            max_content_length,
            citation_format: parse_var(&lookup, "CITATION_FORMAT", CitationFormat::Apa)?,
            enable_fact_check: parse_var(&lookup, "ENABLE_FACT_CHECK", false)?,
            templates_path: non_empty("TEMPLATES_PATH").map(PathBuf::from),
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Upper bound for `max_words` on a generation request.
    #[must_use]
    pub fn max_words_limit(&self) -> u32 {
        self.max_content_length.min(crate::models::MAX_WORDS_CEILING)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parse `key` through `lookup`, falling back to `default` when unset or blank.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is present but does not parse.
pub fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(key, e.to_string())),
        _ => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
