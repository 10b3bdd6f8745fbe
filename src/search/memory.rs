//! In-memory document index scored by query-term overlap.
//!
//! Score is the fraction of distinct query terms (lowercased alphanumeric
//! words of two or more characters) that appear in a document's title or
//! content, so it always lies in `0.0..=1.0`. Ties break by document id to
//! keep results deterministic.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::{SearchError, SearchHit, SearchIndex};

/// A document held by [`InMemoryIndex`]; also the fixture file format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
}

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    documents: Vec<(IndexedDocument, HashSet<String>)>,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new(documents: Vec<IndexedDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|doc| {
                let mut doc_terms = terms(&doc.title);
                doc_terms.extend(terms_of(&doc.content));
                (doc, doc_terms)
            })
            .collect();
        Self { documents }
    }

    /// Load a JSON array of [`IndexedDocument`].
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Fixture`] when the file is unreadable or invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, SearchError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Fixture(format!("{}: {e}", path.display())))?;
        let documents: Vec<IndexedDocument> =
            serde_json::from_str(&raw).map_err(|e| SearchError::Fixture(format!("{}: {e}", path.display())))?;
        Ok(Self::new(documents))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn rank(&self, query: &str, top_k: usize, min_score: f64) -> Vec<SearchHit> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        #[allow(clippy::cast_precision_loss)]
        let total = query_terms.len() as f64;

        let mut scored: Vec<(f64, &IndexedDocument)> = self
            .documents
            .iter()
            .filter_map(|(doc, doc_terms)| {
                let matched = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
                #[allow(clippy::cast_precision_loss)]
                let score = matched as f64 / total;
                (matched > 0 && score >= min_score).then_some((score, doc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, doc)| SearchHit {
                document_id: doc.id.clone(),
                content: doc.content.clone(),
                title: doc.title.clone(),
                source: doc.source.clone().unwrap_or_else(|| doc.title.clone()),
                url: doc.url.clone(),
                score,
                page_number: doc.page_number,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SearchIndex for InMemoryIndex {
    async fn search(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self.rank(query, top_k, min_score))
    }

    fn backend(&self) -> &'static str {
        "in_memory"
    }
}

fn terms(text: &str) -> HashSet<String> {
    terms_of(text).collect()
}

fn terms_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
