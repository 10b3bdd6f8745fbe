//! Research agent: runs a section's queries against the document index and
//! merges the hits into one context block plus its citations.

use std::time::Instant;

use futures::future::try_join_all;
use serde_json::json;

use super::{AgentFailure, AgentResult};
use crate::models::{AgentStep, Citation};
use crate::services::citation::dedupe;
use crate::services::rag::RagService;

pub const AGENT_NAME: &str = "ResearchAgent";
pub const TOP_K_PER_QUERY: usize = 2;
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 4000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchResult {
    pub context: String,
    pub citations: Vec<Citation>,
}

#[derive(Clone)]
pub struct ResearchAgent {
    rag: RagService,
}

impl ResearchAgent {
    #[must_use]
    pub fn new(rag: RagService) -> Self {
        Self { rag }
    }

    /// Run every query concurrently, splitting `max_total_context` evenly.
    ///
    /// Query results keep query order; citations are deduplicated by source
    /// and page across queries.
    ///
    /// # Errors
    ///
    /// Returns an [`AgentFailure`] when any index query fails.
    pub async fn research(
        &self,
        queries: &[String],
        top_k_per_query: usize,
        max_total_context: usize,
    ) -> AgentResult<ResearchResult> {
        let started = Instant::now();
        let step = AgentStep::new(
            AGENT_NAME,
            "research",
            json!({ "queries": queries, "top_k_per_query": top_k_per_query }),
        );
        tracing::info!(query_count = queries.len(), top_k = top_k_per_query, "starting research");

        let per_query = max_total_context / queries.len().max(1);
        let lookups = queries
            .iter()
            .map(|query| self.rag.retrieve_and_build_context(query, top_k_per_query, per_query));
        let retrieved = match try_join_all(lookups).await {
            Ok(retrieved) => retrieved,
            Err(e) => return Err(AgentFailure::new(step, started, e)),
        };

        let mut parts = Vec::new();
        let mut citations = Vec::new();
        for (query, found) in queries.iter().zip(retrieved) {
            if found.is_empty() {
                continue;
            }
            parts.push(format!("# Research: {query}\n{}", found.context));
            citations.extend(found.citations);
        }
        let result = ResearchResult { context: parts.join("\n\n"), citations: dedupe(&citations) };

        let step = step.finished(
            started,
            json!({ "context_length": result.context.len(), "citations_count": result.citations.len() }),
        );
        tracing::info!(
            queries_executed = queries.len(),
            citations_found = result.citations.len(),
            context_length = result.context.len(),
            duration_seconds = step.duration_seconds,
            "research completed"
        );
        Ok((result, step))
    }
}

#[cfg(test)]
#[path = "research_test.rs"]
mod tests;
