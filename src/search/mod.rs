//! Document search for retrieval-augmented generation.
//!
//! DESIGN
//! ======
//! The research agent retrieves grounding excerpts through [`SearchIndex`].
//! Production uses Azure AI Search; when it is not configured the service
//! falls back to an [`memory::InMemoryIndex`] (optionally seeded from a JSON
//! fixture) so generation still works end to end, just with a smaller corpus.

pub mod azure;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use crate::config::parse_var;
use crate::error::ErrorCode;
use crate::models::{Citation, ModelError};

pub const DEFAULT_INDEX_NAME: &str = "contentforge-documents";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_SCORE: f64 = 0.7;
pub const CITATION_EXCERPT_CHARS: usize = 500;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search config invalid: {0}")]
    Config(String),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("search request timed out: {0}")]
    Timeout(String),

    #[error("search service returned status {status}")]
    Response { status: u16, body: String },

    #[error("search response parse failed: {0}")]
    Parse(String),

    #[error("fixture load failed: {0}")]
    Fixture(String),
}

impl SearchError {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout(err.to_string()) } else { Self::Request(err.to_string()) }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl ErrorCode for SearchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_SEARCH_CONFIG",
            Self::Request(_) => "E_SEARCH_REQUEST",
            Self::Timeout(_) => "E_SEARCH_TIMEOUT",
            Self::Response { .. } => "E_SEARCH_RESPONSE",
            Self::Parse(_) => "E_SEARCH_PARSE",
            Self::Fixture(_) => "E_SEARCH_FIXTURE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// HITS
// =============================================================================

/// One document returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document_id: String,
    pub content: String,
    pub title: String,
    pub source: String,
    pub url: Option<String>,
    pub score: f64,
    pub page_number: Option<u32>,
}

impl SearchHit {
    /// Attribution for this hit with the excerpt cut to 500 chars.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Empty`] when the hit has no content.
    pub fn to_citation(&self) -> Result<Citation, ModelError> {
        let excerpt: String = self.content.chars().take(CITATION_EXCERPT_CHARS).collect();
        Ok(Citation::new(excerpt, self.source.clone())?
            .with_relevance(self.score)
            .with_url(self.url.clone())
            .with_page(self.page_number))
    }
}

// =============================================================================
// SEARCH INDEX TRAIT
// =============================================================================

/// A document index the research agent can query.
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    /// Return up to `top_k` hits scoring at least `min_score`, best first.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] when the backing service fails.
    async fn search(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchHit>, SearchError>;

    /// Short backend label for health reporting.
    fn backend(&self) -> &'static str;
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug)]
pub struct AzureSearchConfig {
    pub endpoint: String,
    pub api_key: SecretString,
    pub index_name: String,
    pub semantic_config: Option<String>,
}

#[derive(Debug)]
pub struct SearchConfig {
    pub azure: Option<AzureSearchConfig>,
    pub fixture_path: Option<PathBuf>,
    pub top_k: usize,
    pub min_score: f64,
}

impl SearchConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for malformed values.
    pub fn from_env() -> Result<Self, SearchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Azure is enabled only when both `AI_SEARCH_ENDPOINT` and
    /// `AI_SEARCH_API_KEY` are set.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SearchError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let to_err = |e: crate::config::ConfigError| SearchError::Config(e.to_string());

        let azure = match (get("AI_SEARCH_ENDPOINT"), get("AI_SEARCH_API_KEY")) {
            (Some(endpoint), Some(key)) => Some(AzureSearchConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: SecretString::new(key),
                index_name: get("AI_SEARCH_INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.into()),
                semantic_config: get("AI_SEARCH_SEMANTIC_CONFIG"),
            }),
            _ => None,
        };

        let top_k = parse_var(&lookup, "AI_SEARCH_TOP_K", DEFAULT_TOP_K).map_err(to_err)?;
        if top_k == 0 {
            return Err(SearchError::Config("AI_SEARCH_TOP_K must be positive".into()));
        }
        let min_score = parse_var(&lookup, "AI_SEARCH_MIN_SCORE", DEFAULT_MIN_SCORE).map_err(to_err)?;
        if !min_score.is_finite() || min_score < 0.0 {
            return Err(SearchError::Config("AI_SEARCH_MIN_SCORE must be a non-negative number".into()));
        }

        Ok(Self { azure, fixture_path: get("AI_SEARCH_FIXTURE_PATH").map(PathBuf::from), top_k, min_score })
    }

    /// Build the configured index: Azure when configured, else in-memory.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] if the HTTP client or fixture fails to load.
    pub fn build_index(self) -> Result<Arc<dyn SearchIndex>, SearchError> {
        if let Some(azure) = self.azure {
            tracing::info!(index = %azure.index_name, semantic = azure.semantic_config.is_some(), "using Azure AI Search");
            return Ok(Arc::new(azure::AzureSearchClient::new(azure)?));
        }
        let index = match &self.fixture_path {
            Some(path) => memory::InMemoryIndex::from_json_file(path)?,
            None => memory::InMemoryIndex::default(),
        };
        tracing::warn!(documents = index.len(), "Azure AI Search not configured, using in-memory index");
        Ok(Arc::new(index))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
