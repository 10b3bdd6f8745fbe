use super::*;
use crate::search::memory::{InMemoryIndex, IndexedDocument};

fn doc(id: &str, source: &str, content: &str) -> IndexedDocument {
    IndexedDocument {
        id: id.into(),
        title: format!("{source} title"),
        content: content.into(),
        source: Some(source.into()),
        url: None,
        page_number: None,
    }
}

fn service(docs: Vec<IndexedDocument>) -> RagService {
    RagService::new(Arc::new(InMemoryIndex::new(docs)), 0.0)
}

#[tokio::test]
async fn builds_numbered_blocks_with_citations() {
    let rag = service(vec![
        doc("1", "Cloud Report", "Cloud adoption rose sharply."),
        doc("2", "Market Brief", "Cloud spending doubled."),
    ]);
    let ctx = rag.retrieve_and_build_context("cloud adoption", 5, 1000).await.unwrap();
    assert!(ctx.context.starts_with("[1] Source: Cloud Report\nCloud adoption rose sharply."));
    assert!(ctx.context.contains("\n\n[2] Source: Market Brief\n"));
    let ids: Vec<&str> = ctx.citations.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cite-1", "cite-2"]);
    assert_eq!(ctx.citations[0].source, "Cloud Report");
}

#[tokio::test]
async fn stops_before_block_that_exceeds_budget() {
    let long = "cloud ".repeat(200);
    let rag = service(vec![doc("1", "Short", "cloud facts"), doc("2", "Long", &long)]);
    let ctx = rag.retrieve_and_build_context("cloud", 5, 20).await.unwrap();
    assert_eq!(ctx.citations.len(), 1);
    assert!(!ctx.context.contains("Long"));
    assert!(ctx.estimated_tokens <= 20);
}

#[tokio::test]
async fn no_hits_gives_empty_context() {
    let rag = service(vec![doc("1", "A", "unrelated text")]);
    let ctx = rag.retrieve_and_build_context("quantum", 5, 1000).await.unwrap();
    assert!(ctx.is_empty());
    assert!(ctx.citations.is_empty());
}

#[tokio::test]
async fn reports_backend() {
    assert_eq!(service(Vec::new()).backend(), "in_memory");
}
