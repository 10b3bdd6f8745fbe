//! Citation formatting, deduplication and reference lists.
//!
//! Inline markers and reference entries follow the four supported styles.
//! Two citations are the same source when their source label and page
//! match; the first occurrence wins everywhere.

use std::collections::{HashMap, HashSet};

use crate::models::{Citation, CitationFormat};

pub fn format_inline(citation: &Citation, style: CitationFormat) -> String {
    let year = citation.retrieved_at.year();
    match style {
        CitationFormat::Apa => format!("({}, {year})", citation.source),
        CitationFormat::Mla => match citation.page_number {
            Some(page) => format!("({} {page})", citation.source),
            None => format!("({})", citation.source),
        },
        CitationFormat::Chicago => format!("({})", citation.source),
        CitationFormat::Ieee => format!("[{}]", citation.id),
    }
}

pub fn format_reference(citation: &Citation, style: CitationFormat) -> String {
    let source = &citation.source;
    let year = citation.retrieved_at.year();
    let url = citation.url.as_ref().map(|u| format!(" Retrieved from {u}")).unwrap_or_default();
    match (style, citation.page_number) {
        (CitationFormat::Apa, Some(page)) => format!("{source}. ({year}) (p. {page}).{url}"),
        (CitationFormat::Apa, None) => format!("{source}. ({year}).{url}"),
        (CitationFormat::Mla, Some(page)) => format!("{source}. {page} {year}.{url}"),
        (CitationFormat::Mla, None) => format!("{source}. {year}.{url}"),
        (CitationFormat::Chicago, Some(page)) => format!("{source}, {page}. {year}.{url}"),
        (CitationFormat::Chicago, None) => format!("{source}. {year}.{url}"),
        (CitationFormat::Ieee, _) => format!("[{}] {source}, {year}.{url}", citation.id),
    }
}

#[must_use]
pub fn reference_header(style: CitationFormat) -> &'static str {
    match style {
        CitationFormat::Apa | CitationFormat::Ieee => "References",
        CitationFormat::Mla => "Works Cited",
        CitationFormat::Chicago => "Bibliography",
    }
}

/// Drop repeated sources, keeping the first occurrence and the input order.
#[must_use]
pub fn dedupe(citations: &[Citation]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let unique: Vec<Citation> = citations
        .iter()
        .filter(|c| seen.insert(c.dedupe_key()))
        .cloned()
        .collect();
    tracing::debug!(original_count = citations.len(), unique_count = unique.len(), "deduplicated citations");
    unique
}

/// Deduplicated entries sorted by source, case-insensitively.
#[must_use]
pub fn reference_entries(citations: &[Citation], style: CitationFormat) -> Vec<String> {
    let mut unique = dedupe(citations);
    unique.sort_by_cached_key(|c| c.source.to_lowercase());
    unique.iter().map(|c| format_reference(c, style)).collect()
}

/// Header plus entries separated by blank lines; empty when there is nothing to cite.
#[must_use]
pub fn reference_list(citations: &[Citation], style: CitationFormat) -> String {
    let entries = reference_entries(citations, style);
    if entries.is_empty() {
        return String::new();
    }
    tracing::info!(citation_count = entries.len(), style = style.as_str(), "generated reference list");
    format!("{}\n\n{}", reference_header(style), entries.join("\n\n"))
}

/// Append one inline marker per paragraph, in citation order, until the
/// citations run out.
#[must_use]
pub fn insert_inline_citations(content: &str, citations: &[Citation], style: CitationFormat) -> String {
    if citations.is_empty() {
        return content.to_string();
    }
    let mut markers = citations.iter().map(|c| format_inline(c, style));
    content
        .split("\n\n")
        .map(|paragraph| {
            if paragraph.trim().is_empty() {
                return paragraph.to_string();
            }
            match markers.next() {
                Some(marker) => format!("{paragraph} {marker}"),
                None => paragraph.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Report-wide citation numbering.
///
/// Each distinct source is assigned `cite-n` on first sight; later sections
/// citing the same source reuse its id.
#[derive(Debug, Default)]
pub struct CitationRegistry {
    by_key: HashMap<String, usize>,
    ordered: Vec<Citation>,
}

impl CitationRegistry {
    /// Register a section's citations and return them with report-wide ids,
    /// deduplicated within the section.
    pub fn register(&mut self, citations: Vec<Citation>) -> Vec<Citation> {
        let mut section_keys = HashSet::new();
        let mut registered = Vec::with_capacity(citations.len());
        for mut citation in citations {
            let key = citation.dedupe_key();
            if !section_keys.insert(key.clone()) {
                continue;
            }
            let index = match self.by_key.get(&key) {
                Some(&index) => index,
                None => {
                    let index = self.ordered.len();
                    citation.id = format!("cite-{}", index + 1);
                    self.ordered.push(citation.clone());
                    self.by_key.insert(key, index);
                    index
                }
            };
            citation.id.clone_from(&self.ordered[index].id);
            registered.push(citation);
        }
        registered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    #[must_use]
    pub fn citations(&self) -> &[Citation] {
        &self.ordered
    }

    #[must_use]
    pub fn into_citations(self) -> Vec<Citation> {
        self.ordered
    }
}

#[cfg(test)]
#[path = "citation_test.rs"]
mod tests;
