use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> Result<SearchConfig, SearchError> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    SearchConfig::from_lookup(|key| map.get(key).cloned())
}

fn hit(content: &str, score: f64) -> SearchHit {
    SearchHit {
        document_id: "doc-1".into(),
        content: content.into(),
        title: "Annual Report".into(),
        source: "Annual Report 2024".into(),
        url: Some("https://example.com/ar".into()),
        score,
        page_number: Some(4),
    }
}

#[test]
fn to_citation_truncates_excerpt() {
    let long = "é".repeat(600);
    let citation = hit(&long, 0.9).to_citation().unwrap();
    assert_eq!(citation.text.chars().count(), 500);
    assert_eq!(citation.source, "Annual Report 2024");
    assert_eq!(citation.page_number, Some(4));
    assert_eq!(citation.url.as_deref(), Some("https://example.com/ar"));
    assert!((citation.relevance_score - 0.9).abs() < f64::EPSILON);
}

#[test]
fn to_citation_clamps_unbounded_scores() {
    let citation = hit("text", 12.5).to_citation().unwrap();
    assert!((citation.relevance_score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn to_citation_rejects_empty_content() {
    assert!(hit("", 0.9).to_citation().is_err());
}

#[test]
fn config_defaults_without_azure() {
    let cfg = config_from(&[]).unwrap();
    assert!(cfg.azure.is_none());
    assert_eq!(cfg.top_k, 5);
    assert!((cfg.min_score - 0.7).abs() < f64::EPSILON);
}

#[test]
fn azure_needs_endpoint_and_key() {
    assert!(config_from(&[("AI_SEARCH_ENDPOINT", "https://s.search.windows.net")]).unwrap().azure.is_none());
    let cfg = config_from(&[
        ("AI_SEARCH_ENDPOINT", "https://s.search.windows.net/"),
        ("AI_SEARCH_API_KEY", "k"),
        ("AI_SEARCH_SEMANTIC_CONFIG", "default"),
    ])
    .unwrap();
    let azure = cfg.azure.unwrap();
    assert_eq!(azure.endpoint, "https://s.search.windows.net");
    assert_eq!(azure.index_name, DEFAULT_INDEX_NAME);
    assert_eq!(azure.semantic_config.as_deref(), Some("default"));
}

#[test]
fn invalid_numbers_are_rejected() {
    assert!(config_from(&[("AI_SEARCH_TOP_K", "0")]).is_err());
    assert!(config_from(&[("AI_SEARCH_MIN_SCORE", "-1")]).is_err());
    assert!(config_from(&[("AI_SEARCH_MIN_SCORE", "high")]).is_err());
}

#[test]
fn build_index_falls_back_to_memory() {
    let index = config_from(&[]).unwrap().build_index().unwrap();
    assert_eq!(index.backend(), "in_memory");
}

#[test]
fn retryable_errors() {
    assert!(SearchError::Timeout("t".into()).retryable());
    assert!(SearchError::Response { status: 503, body: String::new() }.retryable());
    assert!(!SearchError::Response { status: 403, body: String::new() }.retryable());
    assert!(!SearchError::Parse("p".into()).retryable());
}
