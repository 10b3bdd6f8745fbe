//! Editing agent: polishes the assembled draft and appends the reference
//! list. Also runs the optional fact check, which reports problems instead
//! of failing.

use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use super::{AgentFailure, AgentResult, estimate_tokens};
use crate::models::{AgentStep, Citation, CitationFormat, ContentType, word_count};
use crate::services::citation::reference_list;
use crate::services::completion::CompletionService;

pub const AGENT_NAME: &str = "EditingAgent";
pub const EDIT_TEMPERATURE: f32 = 0.3;
pub const FACT_CHECK_TEMPERATURE: f32 = 0.2;
pub const MIN_EDIT_TOKENS: u32 = 256;
pub const MAX_EDIT_TOKENS: u32 = 16_000;

const EDIT_INSTRUCTION: &str = "You are an expert editor specializing in business and technical content.\n\n\
Your role is to REFINE, not rewrite. Focus on:\n\
1. Grammar, punctuation, and spelling\n\
2. Clarity and readability\n\
3. Logical flow between paragraphs\n\
4. Consistent tone and style\n\
5. Professional formatting\n\n\
CRITICAL RULES:\n\
- Preserve all factual content\n\
- Do not remove or alter citations\n\
- Do not add new information\n\
- Make minimal, targeted improvements\n\
- Maintain the author's voice";

const FACT_CHECK_INSTRUCTION: &str = "You are a meticulous fact-checker.\n\
Your job is to ensure every claim has source support.\n\
Be thorough but fair in your assessment.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactCheck {
    pub verified: bool,
    pub issues: Vec<String>,
}

#[must_use]
pub fn tone(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Report => "formal and analytical",
        ContentType::Article => "engaging and informative",
        ContentType::MarketingCopy => "persuasive and compelling",
        ContentType::Email => "professional but conversational",
        ContentType::Summary => "concise and clear",
        ContentType::Presentation => "punchy and impactful",
    }
}

#[must_use]
pub fn build_editing_prompt(content: &str, content_type: ContentType) -> String {
    let tone = tone(content_type);
    format!(
        "Edit and refine the following content.\n\n\
         Content Type: {content_type}\n\
         Desired Tone: {tone}\n\n\
         Content to Edit:\n{content}\n\n\
         Instructions:\n\
         1. Fix any grammar, spelling, or punctuation errors\n\
         2. Improve clarity and readability\n\
         3. Ensure smooth transitions between ideas\n\
         4. Maintain consistent {tone} tone\n\
         5. Keep all factual content and citations intact\n\
         6. Format professionally with proper paragraphs\n\n\
         Provide the edited version:\n"
    )
}

/// Output budget for an edit: about the input's length in tokens.
#[must_use]
pub fn edit_max_tokens(content: &str) -> u32 {
    let half = u32::try_from(content.len() / 2).unwrap_or(MAX_EDIT_TOKENS);
    half.clamp(MIN_EDIT_TOKENS, MAX_EDIT_TOKENS)
}

/// A fact-check answer passes when it contains `VERIFIED`, in any case.
#[must_use]
pub fn parse_fact_check(answer: &str) -> FactCheck {
    let verified = answer.to_uppercase().contains("VERIFIED");
    let issues = if verified { Vec::new() } else { vec![answer.trim().to_string()] };
    FactCheck { verified, issues }
}

#[derive(Clone)]
pub struct EditingAgent {
    completion: CompletionService,
}

impl EditingAgent {
    #[must_use]
    pub fn new(completion: CompletionService) -> Self {
        Self { completion }
    }

    /// Polish `content` and append the reference list for `citations`.
    ///
    /// # Errors
    ///
    /// Returns an [`AgentFailure`] when the model call fails.
    pub async fn edit_content(
        &self,
        content: &str,
        citations: &[Citation],
        content_type: ContentType,
        citation_format: CitationFormat,
    ) -> AgentResult<String> {
        let started = Instant::now();
        let step = AgentStep::new(
            AGENT_NAME,
            "editing",
            json!({ "original_length": content.len(), "citations_count": citations.len() }),
        );
        tracing::info!(content_length = content.len(), citations_count = citations.len(), "editing content");

        let completion = match self
            .completion
            .generate_with_context(
                &build_editing_prompt(content, content_type),
                "",
                EDIT_INSTRUCTION,
                EDIT_TEMPERATURE,
                Some(edit_max_tokens(content)),
            )
            .await
        {
            Ok(completion) => completion,
            Err(e) => return Err(AgentFailure::new(step, started, e)),
        };

        let mut edited = completion.text;
        let references = reference_list(citations, citation_format);
        if !references.is_empty() {
            edited.push_str("\n\n");
            edited.push_str(&references);
        }

        let tokens = if completion.tokens > 0 { completion.tokens } else { estimate_tokens(&edited) };
        let step = step
            .finished(started, json!({ "edited_length": edited.len(), "word_count": word_count(&edited) }))
            .with_tokens(tokens);
        tracing::info!(
            original_words = word_count(content),
            edited_words = word_count(&edited),
            duration_seconds = step.duration_seconds,
            "content edited"
        );
        Ok((edited, step))
    }

    /// Check `content` against the cited excerpts.
    ///
    /// A model failure is reported as an unverified result with the error as
    /// its only issue; the returned step records the error.
    pub async fn fact_check(&self, content: &str, citations: &[Citation]) -> (FactCheck, AgentStep) {
        let started = Instant::now();
        let step = AgentStep::new(AGENT_NAME, "fact_checking", json!({ "content_length": content.len() }));
        tracing::info!("performing fact check");

        let sources = citations
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}: {}", i + 1, c.source, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Review the following content and verify that all factual claims are supported by the provided sources.\n\n\
             Content:\n{content}\n\n\
             Available Sources:\n{sources}\n\n\
             Identify any claims that are NOT supported by the sources. List them clearly.\n\
             If all claims are supported, respond with \"VERIFIED: All claims are supported.\"\n"
        );

        match self
            .completion
            .generate_with_context(&prompt, "", FACT_CHECK_INSTRUCTION, FACT_CHECK_TEMPERATURE, None)
            .await
        {
            Ok(completion) => {
                let check = parse_fact_check(&completion.text);
                let step = step
                    .finished(started, json!({ "verified": check.verified, "issues_count": check.issues.len() }))
                    .with_tokens(completion.tokens);
                tracing::info!(verified = check.verified, duration_seconds = step.duration_seconds, "fact check completed");
                (check, step)
            }
            Err(e) => {
                tracing::warn!(error = %e, "fact check failed");
                let check = FactCheck { verified: false, issues: vec![format!("Fact-check error: {e}")] };
                (check, step.failed(started, &e))
            }
        }
    }
}

#[cfg(test)]
#[path = "editing_test.rs"]
mod tests;
