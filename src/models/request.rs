//! Generation request and response envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::report::{CitationFormat, ContentType, Report};
use crate::error::FieldError;

pub const MIN_PROMPT_CHARS: usize = 10;
pub const MAX_PROMPT_CHARS: usize = 2000;
pub const MIN_WORDS: u32 = 100;
/// Hard ceiling for `max_words`, regardless of `MAX_CONTENT_LENGTH`.
pub const MAX_WORDS_CEILING: u32 = 10_000;
pub const DEFAULT_MAX_WORDS: u32 = 2000;
pub const MAX_TAGS: usize = 10;

const fn default_max_words() -> u32 {
    DEFAULT_MAX_WORDS
}

const fn default_true() -> bool {
    true
}

/// Body of `POST /content/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub citation_format: Option<CitationFormat>,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
    #[serde(default = "default_true")]
    pub include_citations: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            content_type: ContentType::default(),
            citation_format: None,
            max_words: DEFAULT_MAX_WORDS,
            include_citations: true,
            tags: Vec::new(),
            template_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Check every field and report all failures together.
    ///
    /// `max_words_limit` is the configured upper bound (never above
    /// [`MAX_WORDS_CEILING`]).
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per violated rule.
    pub fn validate(&self, max_words_limit: u32) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let prompt_chars = self.prompt.trim().chars().count();
        if prompt_chars < MIN_PROMPT_CHARS {
            errors.push(FieldError::new("prompt", format!("must be at least {MIN_PROMPT_CHARS} characters")));
        } else if prompt_chars > MAX_PROMPT_CHARS {
            errors.push(FieldError::new("prompt", format!("must be at most {MAX_PROMPT_CHARS} characters")));
        }

        let upper = max_words_limit.min(MAX_WORDS_CEILING);
        if self.max_words < MIN_WORDS || self.max_words > upper {
            errors.push(FieldError::new("max_words", format!("must be between {MIN_WORDS} and {upper}")));
        }

        if self.tags.len() > MAX_TAGS {
            errors.push(FieldError::new("tags", format!("at most {MAX_TAGS} tags are allowed")));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            errors.push(FieldError::new("tags", "tags must not be blank"));
        }

        if self.template_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            errors.push(FieldError::new("template_id", "must not be blank"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Body returned by `POST /content/generate` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl GenerationResponse {
    #[must_use]
    pub fn completed(report: Report) -> Self {
        let message = format!(
            "Generated {} sections ({} words) in {:.1}s",
            report.sections.len(),
            report.word_count(),
            report.generation_time_seconds
        );
        Self { success: true, report: Some(report), error: None, message }
    }
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
