//! Report aggregate and the entities it owns.
//!
//! DESIGN
//! ======
//! `Report` is the unit the pipeline produces and the store holds. Its
//! sections and citations are validated at construction so every report in
//! the store satisfies the length and range rules without re-checking.
//! Sections always stay numbered `0..n` in display order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::word_count;

pub const MAX_SECTION_TITLE_CHARS: usize = 200;
pub const MAX_SECTION_WORDS: usize = 5000;
pub const MAX_REPORT_TITLE_CHARS: usize = 300;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("section content exceeds maximum {max} words ({actual})")]
    TooManyWords { max: usize, actual: usize },
}

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Report,
    Summary,
    Article,
    MarketingCopy,
    Email,
    Presentation,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Summary => "summary",
            Self::Article => "article",
            Self::MarketingCopy => "marketing_copy",
            Self::Email => "email",
            Self::Presentation => "presentation",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Draft,
    Generating,
    Completed,
    Failed,
    Published,
}

impl ContentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Published => "published",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "published" => Ok(Self::Published),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CitationFormat {
    #[default]
    #[serde(rename = "APA")]
    Apa,
    #[serde(rename = "MLA")]
    Mla,
    #[serde(rename = "Chicago")]
    Chicago,
    #[serde(rename = "IEEE")]
    Ieee,
}

impl CitationFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apa => "APA",
            Self::Mla => "MLA",
            Self::Chicago => "Chicago",
            Self::Ieee => "IEEE",
        }
    }
}

impl FromStr for CitationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apa" => Ok(Self::Apa),
            "mla" => Ok(Self::Mla),
            "chicago" => Ok(Self::Chicago),
            "ieee" => Ok(Self::Ieee),
            other => Err(format!("expected APA, MLA, Chicago or IEEE, got '{other}'")),
        }
    }
}

// =============================================================================
// CITATION
// =============================================================================

/// Attribution for a retrieved excerpt backing generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub text: String,
    pub source: String,
    pub source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub retrieved_at: OffsetDateTime,
}

impl Citation {
    /// Create a citation with full relevance, retrieved now.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Empty`] when `text` or `source` is blank.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Result<Self, ModelError> {
        let text = text.into();
        let source = source.into();
        if text.trim().is_empty() {
            return Err(ModelError::Empty("citation text"));
        }
        if source.trim().is_empty() {
            return Err(ModelError::Empty("citation source"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            text,
            source,
            source_type: "document".into(),
            page_number: None,
            relevance_score: 1.0,
            url: None,
            retrieved_at: OffsetDateTime::now_utc(),
        })
    }

    /// Set relevance, clamped to `0.0..=1.0`. Non-finite scores become 0.
    #[must_use]
    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url.filter(|u| !u.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page_number: Option<u32>) -> Self {
        self.page_number = page_number;
        self
    }

    /// Key used to detect the same source cited twice.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        match self.page_number {
            Some(page) => format!("{}:{page}", self.source),
            None => format!("{}:none", self.source),
        }
    }
}

// =============================================================================
// SECTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[default]
    Narrative,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: String,
    pub title: String,
    pub content: String,
    pub order: usize,
    pub kind: SectionKind,
    /// Parsed cells when `kind` is `table`; header row first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
    pub citations: Vec<Citation>,
}

impl ContentSection {
    /// # Errors
    ///
    /// Returns a [`ModelError`] when the title is blank or over 200 chars, or
    /// the content is blank or over 5000 words.
    pub fn new(title: impl Into<String>, content: impl Into<String>, order: usize) -> Result<Self, ModelError> {
        let title = title.into().trim().to_string();
        let content = content.into();
        if title.is_empty() {
            return Err(ModelError::Empty("section title"));
        }
        if title.chars().count() > MAX_SECTION_TITLE_CHARS {
            return Err(ModelError::TooLong { field: "section title", max: MAX_SECTION_TITLE_CHARS });
        }
        if content.trim().is_empty() {
            return Err(ModelError::Empty("section content"));
        }
        let words = word_count(&content);
        if words > MAX_SECTION_WORDS {
            return Err(ModelError::TooManyWords { max: MAX_SECTION_WORDS, actual: words });
        }

        let rows = parse_markdown_table(&content).unwrap_or_default();
        let kind = if rows.is_empty() { SectionKind::Narrative } else { SectionKind::Table };
        Ok(Self { id: Uuid::new_v4().to_string(), title, content, order, kind, rows, citations: Vec::new() })
    }

    #[must_use]
    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// Parse content that is entirely a markdown pipe table.
///
/// Returns `None` unless every non-blank line is a pipe row and the second
/// row is a `---` separator. The separator is dropped from the result.
#[must_use]
pub fn parse_markdown_table(content: &str) -> Option<Vec<Vec<String>>> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 || !lines.iter().all(|l| l.starts_with('|')) {
        return None;
    }
    if !is_separator_row(lines[1]) {
        return None;
    }

    let rows = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, line)| split_row(line))
        .collect();
    Some(rows)
}

fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_separator_row(line: &str) -> bool {
    let cells = split_row(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let core = cell.trim_matches(':');
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

// =============================================================================
// AGENT STEP
// =============================================================================

/// One recorded step of the agent pipeline, kept for auditing and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub agent_name: String,
    pub step_type: String,
    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentStep {
    pub fn new(agent_name: &str, step_type: &str, input_data: serde_json::Value) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            step_type: step_type.to_string(),
            input_data,
            output_data: serde_json::Value::Object(serde_json::Map::new()),
            duration_seconds: 0.0,
            tokens_used: None,
            timestamp: OffsetDateTime::now_utc(),
            error: None,
        }
    }

    #[must_use]
    pub fn finished(mut self, started: std::time::Instant, output_data: serde_json::Value) -> Self {
        self.duration_seconds = started.elapsed().as_secs_f64();
        self.output_data = output_data;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    #[must_use]
    pub fn failed(mut self, started: std::time::Instant, error: &impl fmt::Display) -> Self {
        self.duration_seconds = started.elapsed().as_secs_f64();
        self.error = Some(error.to_string());
        self
    }
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub sections: Vec<ContentSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    /// Full document after the editing pass, reference list included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_content: Option<String>,
    pub citations: Vec<Citation>,
    pub citation_format: CitationFormat,
    pub prompt: String,
    pub agent_steps: Vec<AgentStep>,
    pub total_tokens_used: u64,
    pub generation_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharepoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Report {
    /// New draft report. The title starts as a prompt excerpt and is
    /// replaced once planning names the document.
    pub fn new(prompt: impl Into<String>, content_type: ContentType, citation_format: CitationFormat) -> Self {
        let prompt = prompt.into();
        let now = OffsetDateTime::now_utc();
        let mut report = Self {
            id: Uuid::new_v4().to_string(),
            title: "Untitled".into(),
            content_type,
            status: ContentStatus::Draft,
            sections: Vec::new(),
            executive_summary: None,
            edited_content: None,
            citations: Vec::new(),
            citation_format,
            prompt,
            agent_steps: Vec::new(),
            total_tokens_used: 0,
            generation_time_seconds: 0.0,
            user_id: None,
            template_id: None,
            created_at: now,
            updated_at: now,
            published_at: None,
            sharepoint_url: None,
            teams_channel: None,
            error: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
        };
        let excerpt: String = report.prompt.chars().take(80).collect();
        report.set_title(&excerpt);
        report
    }

    /// Set the title, trimmed and cut to 300 chars. Blank titles are ignored.
    pub fn set_title(&mut self, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        self.title = title.chars().take(MAX_REPORT_TITLE_CHARS).collect();
    }

    /// Append a section at the end of the report.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when the section fails validation.
    pub fn add_section(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        citations: Vec<Citation>,
    ) -> Result<(), ModelError> {
        let section = ContentSection::new(title, content, self.sections.len())?.with_citations(citations);
        self.sections.push(section);
        self.touch();
        Ok(())
    }

    pub fn add_citation(&mut self, citation: Citation) {
        self.citations.push(citation);
    }

    /// Record a pipeline step; its token usage counts toward the total.
    pub fn add_agent_step(&mut self, step: AgentStep) {
        if let Some(tokens) = step.tokens_used {
            self.total_tokens_used = self.total_tokens_used.saturating_add(tokens);
        }
        self.agent_steps.push(step);
    }

    pub fn mark_generating(&mut self) {
        self.status = ContentStatus::Generating;
        self.touch();
    }

    pub fn mark_completed(&mut self) {
        self.status = ContentStatus::Completed;
        self.error = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = ContentStatus::Failed;
        self.error = Some(reason.into());
        self.touch();
    }

    pub fn mark_published(&mut self, sharepoint_url: Option<String>, teams_channel: Option<String>) {
        let now = OffsetDateTime::now_utc();
        self.status = ContentStatus::Published;
        self.published_at = Some(now);
        self.updated_at = now;
        if sharepoint_url.is_some() {
            self.sharepoint_url = sharepoint_url;
        }
        if teams_channel.is_some() {
            self.teams_channel = teams_channel;
        }
    }

    /// Report-level plus section-level citations.
    #[must_use]
    pub fn total_citations(&self) -> usize {
        self.citations.len() + self.sections.iter().map(|s| s.citations.len()).sum::<usize>()
    }

    /// Words in the executive summary and every section body.
    #[must_use]
    pub fn word_count(&self) -> usize {
        let summary = self.executive_summary.as_deref().map_or(0, word_count);
        summary + self.sections.iter().map(|s| word_count(&s.content)).sum::<usize>()
    }

    /// Stable-sort sections by `order`, then renumber them `0..n`.
    pub fn normalize_section_order(&mut self) {
        self.sections.sort_by_key(|s| s.order);
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.order = i;
        }
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
