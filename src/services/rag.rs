//! Retrieval-augmented context building.
//!
//! Hits become numbered blocks (`[n] Source: ...` followed by the excerpt)
//! under a token budget estimated at four characters per token. Building
//! stops before the first block that would exceed the budget, and only
//! blocks that made it into the context produce citations.

use std::sync::Arc;

use crate::models::Citation;
use crate::search::{SearchError, SearchIndex};

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    pub citations: Vec<Citation>,
    pub estimated_tokens: usize,
}

impl RetrievedContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

#[derive(Clone)]
pub struct RagService {
    index: Arc<dyn SearchIndex>,
    min_score: f64,
}

impl RagService {
    #[must_use]
    pub fn new(index: Arc<dyn SearchIndex>, min_score: f64) -> Self {
        Self { index, min_score }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.index.backend()
    }

    /// # Errors
    ///
    /// Returns a [`SearchError`] when the index query fails.
    pub async fn retrieve_and_build_context(
        &self,
        query: &str,
        top_k: usize,
        max_context_tokens: usize,
    ) -> Result<RetrievedContext, SearchError> {
        let preview: String = query.chars().take(100).collect();
        tracing::info!(query = %preview, top_k, "retrieving context");

        let hits = self.index.search(query, top_k, self.min_score).await?;
        if hits.is_empty() {
            tracing::warn!(query = %preview, "no search results");
            return Ok(RetrievedContext::default());
        }

        let mut parts = Vec::new();
        let mut citations = Vec::new();
        let mut estimated_tokens = 0;
        for hit in &hits {
            let number = parts.len() + 1;
            let block = format_block(number, &hit.source, &hit.content);
            let block_tokens = block.len() / CHARS_PER_TOKEN;
            if estimated_tokens + block_tokens > max_context_tokens {
                tracing::debug!(included = parts.len(), "context budget reached");
                break;
            }
            match hit.to_citation() {
                Ok(mut citation) => {
                    citation.id = format!("cite-{number}");
                    citations.push(citation);
                }
                Err(e) => {
                    tracing::debug!(document_id = %hit.document_id, error = %e, "skipping hit without content");
                    continue;
                }
            }
            parts.push(block);
            estimated_tokens += block_tokens;
        }

        let context = parts.join("\n\n");
        tracing::info!(
            documents_included = citations.len(),
            context_length = context.len(),
            estimated_tokens,
            "built RAG context"
        );
        Ok(RetrievedContext { context, citations, estimated_tokens })
    }
}

fn format_block(number: usize, source: &str, content: &str) -> String {
    format!("[{number}] Source: {source}\n{content}")
}

#[cfg(test)]
#[path = "rag_test.rs"]
mod tests;
