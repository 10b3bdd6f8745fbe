//! Drafting agent: writes one section at a time from its research context,
//! then an executive summary over the drafted body.

use std::time::Instant;

use serde_json::json;

use super::{AgentFailure, AgentResult, estimate_tokens, max_tokens_for_words};
use crate::models::report::MAX_SECTION_WORDS;
use crate::models::{AgentStep, ContentType, word_count};
use crate::services::completion::{Completion, CompletionService};

pub const AGENT_NAME: &str = "DraftingAgent";
pub const DRAFT_TEMPERATURE: f32 = 0.7;
pub const SUMMARY_TEMPERATURE: f32 = 0.5;
pub const SUMMARY_MAX_WORDS: u32 = 150;
/// Only the head of the body is sent when summarizing.
pub const SUMMARY_SOURCE_CHARS: usize = 6000;

const BASE_INSTRUCTION: &str = "You are an expert business content writer specializing in enterprise content.\n\n\
CRITICAL RULES:\n\
1. Only use information from the provided context\n\
2. Never fabricate data, statistics, or facts\n\
3. If asked about something not in context, state that clearly\n\
4. Cite sources appropriately\n\
5. Write in a professional, clear style\n\n";

const SUMMARY_INSTRUCTION: &str = "You are an expert at creating concise, impactful executive summaries.\n\
Focus on the most important takeaways and recommendations.";

/// What the planner asked a section to cover.
#[derive(Debug, Clone, Copy)]
pub struct SectionBrief<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub word_count_target: u32,
}

#[must_use]
pub fn system_instruction(content_type: ContentType) -> String {
    let tone = match content_type {
        ContentType::Report => "Use formal, analytical tone. Focus on facts and evidence.",
        ContentType::Article => "Use engaging, informative tone. Balance data with narrative.",
        ContentType::MarketingCopy => "Use persuasive, benefit-focused language. Emphasize value.",
        ContentType::Email => "Use professional but conversational tone. Be concise.",
        ContentType::Summary => "Use clear, bullet-point style. Focus on key points only.",
        ContentType::Presentation => "Use concise, impactful language. Think in slide format.",
    };
    format!("{BASE_INSTRUCTION}{tone}")
}

#[must_use]
pub fn build_drafting_prompt(brief: &SectionBrief<'_>, content_type: ContentType, overall_topic: &str) -> String {
    let mut prompt = format!(
        "Generate content for the following section:\n\n\
         Section Title: {}\n\
         Description: {}\n\
         Target Length: ~{} words\n\
         Content Type: {content_type}\n",
        brief.title, brief.description, brief.word_count_target,
    );
    if !overall_topic.trim().is_empty() {
        prompt.push_str(&format!("Overall Topic: {overall_topic}\n"));
    }
    prompt.push_str(&format!(
        "\nRequirements:\n\
         1. Write clear, professional content\n\
         2. Base ALL claims on the provided context\n\
         3. Do NOT make up facts or statistics\n\
         4. If context lacks information, acknowledge the limitation\n\
         5. Use specific examples and evidence\n\
         6. Maintain logical flow\n\
         7. Target approximately {} words\n\n\
         Write the section content now:\n",
        brief.word_count_target,
    ));
    prompt
}

/// Keep at most `max_words` whitespace-delimited words.
#[must_use]
pub fn truncate_words(text: &str, max_words: usize) -> String {
    if word_count(text) <= max_words {
        return text.to_string();
    }
    text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
}

fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Billed tokens, or an estimate from the text when the provider reports none.
fn tokens_or_estimate(completion: &Completion) -> u64 {
    if completion.tokens > 0 { completion.tokens } else { estimate_tokens(&completion.text) }
}

#[derive(Clone)]
pub struct DraftingAgent {
    completion: CompletionService,
}

impl DraftingAgent {
    #[must_use]
    pub fn new(completion: CompletionService) -> Self {
        Self { completion }
    }

    /// Draft one section grounded in `context`.
    ///
    /// Output longer than the section word limit is truncated.
    ///
    /// # Errors
    ///
    /// Returns an [`AgentFailure`] when the model call fails.
    pub async fn draft_section(
        &self,
        brief: &SectionBrief<'_>,
        context: &str,
        content_type: ContentType,
        overall_topic: &str,
    ) -> AgentResult<String> {
        let started = Instant::now();
        let step = AgentStep::new(
            AGENT_NAME,
            "drafting",
            json!({
                "title": brief.title,
                "description": brief.description,
                "word_count_target": brief.word_count_target,
                "context_length": context.len(),
            }),
        );
        tracing::info!(title = brief.title, word_count_target = brief.word_count_target, "drafting section");

        let prompt = build_drafting_prompt(brief, content_type, overall_topic);
        let completion = match self
            .completion
            .generate_with_context(
                &prompt,
                context,
                &system_instruction(content_type),
                DRAFT_TEMPERATURE,
                Some(max_tokens_for_words(brief.word_count_target)),
            )
            .await
        {
            Ok(completion) => completion,
            Err(e) => return Err(AgentFailure::new(step, started, e)),
        };

        let content = truncate_words(&completion.text, MAX_SECTION_WORDS);
        let words = word_count(&content);
        let step = step
            .finished(started, json!({ "content_length": content.len(), "word_count": words }))
            .with_tokens(tokens_or_estimate(&completion));
        tracing::info!(
            title = brief.title,
            word_count = words,
            target = brief.word_count_target,
            duration_seconds = step.duration_seconds,
            "section drafted"
        );
        Ok((content, step))
    }

    /// Summarize the drafted body in at most 150 words.
    ///
    /// # Errors
    ///
    /// Returns an [`AgentFailure`] when the model call fails.
    pub async fn draft_executive_summary(&self, full_content: &str, title: &str) -> AgentResult<String> {
        let started = Instant::now();
        let step = AgentStep::new(
            AGENT_NAME,
            "summary_generation",
            json!({ "full_content_length": full_content.len() }),
        );
        tracing::info!("generating executive summary");

        let prompt = format!(
            "Create a concise executive summary for the following content.\n\n\
             Title: {title}\n\n\
             Requirements:\n\
             - Maximum {SUMMARY_MAX_WORDS} words\n\
             - Highlight key findings and main points\n\
             - Use clear, professional language\n\
             - Be specific and actionable\n\n\
             Content to summarize:\n{}\n",
            head_chars(full_content, SUMMARY_SOURCE_CHARS),
        );
        let completion = match self
            .completion
            .generate_with_context(
                &prompt,
                "",
                SUMMARY_INSTRUCTION,
                SUMMARY_TEMPERATURE,
                Some(max_tokens_for_words(SUMMARY_MAX_WORDS)),
            )
            .await
        {
            Ok(completion) => completion,
            Err(e) => return Err(AgentFailure::new(step, started, e)),
        };

        let summary = completion.text.clone();
        let step = step
            .finished(started, json!({ "summary_length": summary.len() }))
            .with_tokens(tokens_or_estimate(&completion));
        tracing::info!(word_count = word_count(&summary), "executive summary generated");
        Ok((summary, step))
    }
}

#[cfg(test)]
#[path = "drafting_test.rs"]
mod tests;
