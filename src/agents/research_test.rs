use std::sync::Arc;

use super::*;
use crate::search::memory::{InMemoryIndex, IndexedDocument};
use crate::search::{SearchError, SearchHit, SearchIndex};

fn doc(id: &str, source: &str, content: &str) -> IndexedDocument {
    IndexedDocument {
        id: id.into(),
        title: source.into(),
        content: content.into(),
        source: Some(source.into()),
        url: None,
        page_number: None,
    }
}

fn agent(docs: Vec<IndexedDocument>) -> ResearchAgent {
    ResearchAgent::new(RagService::new(Arc::new(InMemoryIndex::new(docs)), 0.0))
}

fn queries(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

struct FailingIndex;

#[async_trait::async_trait]
impl SearchIndex for FailingIndex {
    async fn search(&self, _: &str, _: usize, _: f64) -> Result<Vec<SearchHit>, SearchError> {
        Err(SearchError::Timeout("index unavailable".into()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn default_budget_fits_full_length_chunks() {
    let body = "Cloud adoption across the enterprise portfolio kept rising this year. ".repeat(13);
    assert!(body.len() > 850);
    let agent = agent(vec![doc("1", "Cloud Report", &body)]);
    let (result, _) = agent
        .research(&queries(&["cloud adoption"]), TOP_K_PER_QUERY, DEFAULT_MAX_CONTEXT_TOKENS)
        .await
        .unwrap();
    assert!(result.context.contains(body.trim_end()));
    assert_eq!(result.citations.len(), 1);
}

#[tokio::test]
async fn merges_queries_in_order_with_headers() {
    let agent = agent(vec![
        doc("1", "Cloud Report", "Cloud adoption rose sharply."),
        doc("2", "Security Brief", "Security incidents fell."),
    ]);
    let (result, step) = agent
        .research(&queries(&["cloud adoption", "security incidents"]), 2, 4000)
        .await
        .unwrap();

    let cloud = result.context.find("# Research: cloud adoption\n[1] Source: Cloud Report").unwrap();
    let security = result.context.find("# Research: security incidents\n").unwrap();
    assert!(cloud < security);
    assert_eq!(result.citations.len(), 2);
    assert_eq!(step.agent_name, AGENT_NAME);
    assert_eq!(step.output_data["citations_count"], 2);
}

#[tokio::test]
async fn citations_are_deduplicated_across_queries() {
    let agent = agent(vec![doc("1", "Cloud Report", "Cloud adoption and cloud security.")]);
    let (result, _) = agent
        .research(&queries(&["cloud adoption", "cloud security"]), 2, 4000)
        .await
        .unwrap();
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].source, "Cloud Report");
}

#[tokio::test]
async fn queries_without_hits_are_skipped() {
    let agent = agent(vec![doc("1", "Cloud Report", "Cloud adoption rose.")]);
    let (result, _) = agent.research(&queries(&["quantum", "cloud"]), 2, 4000).await.unwrap();
    assert!(!result.context.contains("quantum"));
    assert!(result.context.starts_with("# Research: cloud\n"));
}

#[tokio::test]
async fn empty_query_list_gives_empty_result() {
    let (result, step) = agent(Vec::new()).research(&[], 2, 4000).await.unwrap();
    assert_eq!(result, ResearchResult::default());
    assert!(step.error.is_none());
}

#[tokio::test]
async fn index_failure_carries_step() {
    let agent = ResearchAgent::new(RagService::new(Arc::new(FailingIndex), 0.0));
    let failure = agent.research(&queries(&["cloud"]), 2, 4000).await.unwrap_err();
    assert!(failure.error.is_timeout());
    assert_eq!(failure.step.step_type, "research");
    assert!(failure.step.error.as_deref().unwrap_or_default().contains("index unavailable"));
}
