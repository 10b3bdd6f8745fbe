use std::sync::Arc;

use super::*;
use crate::llm::types::{ChatResponse, LlmError};
use crate::state::test_helpers::{MockLlm, text_response};

fn brief() -> SectionBrief<'static> {
    SectionBrief { title: "Market Overview", description: "Size and growth of the market", word_count_target: 300 }
}

#[test]
fn prompt_includes_brief_and_topic() {
    let prompt = build_drafting_prompt(&brief(), ContentType::Article, "Cloud adoption");
    assert!(prompt.contains("Section Title: Market Overview"));
    assert!(prompt.contains("Target Length: ~300 words"));
    assert!(prompt.contains("Content Type: article"));
    assert!(prompt.contains("Overall Topic: Cloud adoption"));

    let no_topic = build_drafting_prompt(&brief(), ContentType::Article, " ");
    assert!(!no_topic.contains("Overall Topic"));
}

#[test]
fn system_instruction_varies_by_type() {
    assert!(system_instruction(ContentType::Email).ends_with("Be concise."));
    assert!(system_instruction(ContentType::Report).contains("Never fabricate data"));
}

#[test]
fn truncate_words_keeps_short_text_verbatim() {
    assert_eq!(truncate_words("one  two\nthree", 5), "one  two\nthree");
    assert_eq!(truncate_words("one two three", 2), "one two");
}

#[test]
fn head_chars_respects_char_boundaries() {
    assert_eq!(head_chars("héllo", 2), "hé");
    assert_eq!(head_chars("hi", 10), "hi");
}

#[tokio::test]
async fn draft_section_sends_context_and_limits() {
    let llm = Arc::new(MockLlm::new(["The market grew 12% last year."]));
    let agent = DraftingAgent::new(CompletionService::new(llm.clone()));

    let (content, step) = agent
        .draft_section(&brief(), "[1] Source: Brief\nGrowth was 12%.", ContentType::Report, "Q3")
        .await
        .unwrap();
    assert_eq!(content, "The market grew 12% last year.");
    assert_eq!(step.step_type, "drafting");
    assert_eq!(step.tokens_used, Some(text_response("").total_tokens()));

    let request = &llm.requests()[0];
    assert_eq!(request.temperature, Some(DRAFT_TEMPERATURE));
    assert_eq!(request.max_tokens, Some(468));
    assert!(request.system_prompt().contains("Growth was 12%."));
}

#[tokio::test]
async fn zero_reported_tokens_fall_back_to_estimate() {
    let response = ChatResponse {
        text: "x".repeat(40),
        model: "mock".into(),
        stop_reason: "stop".into(),
        input_tokens: 0,
        output_tokens: 0,
    };
    let llm = Arc::new(MockLlm::with_results(vec![Ok(response)]));
    let agent = DraftingAgent::new(CompletionService::new(llm));
    let (_, step) = agent.draft_section(&brief(), "", ContentType::Report, "").await.unwrap();
    assert_eq!(step.tokens_used, Some(10));
}

#[tokio::test]
async fn overlong_draft_is_truncated() {
    let long = "word ".repeat(MAX_SECTION_WORDS + 10);
    let agent = DraftingAgent::new(CompletionService::new(Arc::new(MockLlm::new([long]))));
    let (content, _) = agent.draft_section(&brief(), "", ContentType::Report, "").await.unwrap();
    assert_eq!(word_count(&content), MAX_SECTION_WORDS);
}

#[tokio::test]
async fn summary_uses_head_of_body() {
    let body = format!("{}TAIL_MARKER", "a".repeat(SUMMARY_SOURCE_CHARS));
    let llm = Arc::new(MockLlm::new(["Revenue grew; costs fell."]));
    let agent = DraftingAgent::new(CompletionService::new(llm.clone()));

    let (summary, step) = agent.draft_executive_summary(&body, "Q3 Review").await.unwrap();
    assert_eq!(summary, "Revenue grew; costs fell.");
    assert_eq!(step.step_type, "summary_generation");

    let request = &llm.requests()[0];
    assert_eq!(request.temperature, Some(SUMMARY_TEMPERATURE));
    let prompt = &request.messages.last().unwrap().content;
    assert!(prompt.contains("Maximum 150 words"));
    assert!(!prompt.contains("TAIL_MARKER"));
}

#[tokio::test]
async fn draft_failure_carries_step() {
    let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::ApiRequest("reset".into()))]));
    let agent = DraftingAgent::new(CompletionService::new(llm));
    let failure = agent.draft_section(&brief(), "", ContentType::Report, "").await.unwrap_err();
    assert_eq!(failure.step.step_type, "drafting");
    assert!(failure.step.error.is_some());
}
