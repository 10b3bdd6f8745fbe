//! Azure AI Search REST client.
//!
//! `POST {endpoint}/indexes/{index}/docs/search?api-version=2023-11-01` with
//! an `api-key` header. When a semantic configuration is named, the query
//! runs in semantic mode and the first extractive caption replaces the raw
//! document content.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AzureSearchConfig, SearchError, SearchHit, SearchIndex};
use crate::retry::{Backoff, retry_async};

const API_VERSION: &str = "2023-11-01";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(10));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct AzureSearchClient {
    http: reqwest::Client,
    url: String,
    api_key: SecretString,
    semantic_config: Option<String>,
}

impl AzureSearchClient {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the HTTP client fails to build.
    pub fn new(config: AzureSearchConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;
        Ok(Self {
            http,
            url: search_url(&config.endpoint, &config.index_name),
            api_key: config.api_key,
            semantic_config: config.semantic_config,
        })
    }

    async fn search_once(&self, body: &SearchRequest<'_>) -> Result<String, SearchError> {
        let response = self
            .http
            .post(&self.url)
            .header("api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::from_transport(&e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::from_transport(&e))?;
        if status != 200 {
            return Err(SearchError::Response { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl SearchIndex for AzureSearchClient {
    async fn search(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchHit>, SearchError> {
        let body = build_request(query, top_k, self.semantic_config.as_deref());
        let started = std::time::Instant::now();
        let text = retry_async("search.azure", MAX_ATTEMPTS, RETRY_BACKOFF, || self.search_once(&body)).await?;
        let hits = parse_search_response(&text, min_score)?;
        tracing::info!(
            results = hits.len(),
            min_score,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "search completed"
        );
        Ok(hits)
    }

    fn backend(&self) -> &'static str {
        "azure_ai_search"
    }
}

pub(crate) fn search_url(endpoint: &str, index_name: &str) -> String {
    format!("{}/indexes/{index_name}/docs/search?api-version={API_VERSION}", endpoint.trim_end_matches('/'))
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
    count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_configuration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    captions: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answers: Option<&'static str>,
}

pub(crate) fn build_request<'a>(query: &'a str, top_k: usize, semantic_config: Option<&'a str>) -> SearchRequest<'a> {
    let semantic = semantic_config.is_some();
    SearchRequest {
        search: query,
        top: top_k,
        count: true,
        query_type: semantic.then_some("semantic"),
        semantic_configuration: semantic_config,
        captions: semantic.then_some("extractive"),
        answers: semantic.then_some("extractive"),
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    value: Vec<Value>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Convert a search response into hits, dropping those below `min_score`.
pub(crate) fn parse_search_response(json: &str, min_score: f64) -> Result<Vec<SearchHit>, SearchError> {
    let response: SearchResponse = serde_json::from_str(json).map_err(|e| SearchError::Parse(e.to_string()))?;
    Ok(response
        .value
        .iter()
        .filter_map(|doc| {
            let score = doc.get("@search.score").and_then(Value::as_f64).unwrap_or(0.0);
            if score < min_score {
                return None;
            }
            Some(hit_from_document(doc, score))
        })
        .collect())
}

fn hit_from_document(doc: &Value, score: f64) -> SearchHit {
    let str_field = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    let caption = doc
        .get("@search.captions")
        .and_then(Value::as_array)
        .and_then(|captions| captions.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let content = caption.or_else(|| str_field("content")).unwrap_or_default();

    let title = str_field("title").unwrap_or_else(|| "Unknown Document".into());
    let source = str_field("source").unwrap_or_else(|| title.clone());
    let document_id = str_field("id")
        .or_else(|| str_field("document_id"))
        .unwrap_or_else(|| "unknown".into());
    let page_number = doc
        .get("page_number")
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok());

    SearchHit { document_id, content, title, source, url: str_field("url"), score, page_number }
}

#[cfg(test)]
#[path = "azure_test.rs"]
mod tests;
