use std::sync::Arc;

use super::*;
use crate::llm::types::LlmError;
use crate::state::test_helpers::MockLlm;

fn citation(source: &str) -> Citation {
    Citation::new(format!("{source} excerpt"), source).unwrap()
}

#[test]
fn edit_budget_is_clamped() {
    assert_eq!(edit_max_tokens("short"), MIN_EDIT_TOKENS);
    assert_eq!(edit_max_tokens(&"a".repeat(2000)), 1000);
    assert_eq!(edit_max_tokens(&"a".repeat(100_000)), MAX_EDIT_TOKENS);
}

#[test]
fn fact_check_answer_parsing() {
    assert!(parse_fact_check("verified: all claims are supported.").verified);
    let failed = parse_fact_check("  Claim 2 lacks a source.  ");
    assert!(!failed.verified);
    assert_eq!(failed.issues, vec!["Claim 2 lacks a source.".to_string()]);
}

#[test]
fn editing_prompt_names_tone() {
    let prompt = build_editing_prompt("Draft body", ContentType::MarketingCopy);
    assert!(prompt.contains("Desired Tone: persuasive and compelling"));
    assert!(prompt.contains("Content to Edit:\nDraft body"));
}

#[tokio::test]
async fn edit_appends_reference_list() {
    let llm = Arc::new(MockLlm::new(["Polished body."]));
    let agent = EditingAgent::new(CompletionService::new(llm.clone()));

    let (edited, step) = agent
        .edit_content("Draft body.", &[citation("Beta"), citation("alpha")], ContentType::Report, CitationFormat::Mla)
        .await
        .unwrap();
    assert!(edited.starts_with("Polished body.\n\nWorks Cited\n\n"));
    assert!(edited.find("alpha").unwrap() < edited.find("Beta").unwrap());
    assert_eq!(step.step_type, "editing");
    assert_eq!(llm.requests()[0].temperature, Some(EDIT_TEMPERATURE));
}

#[tokio::test]
async fn edit_without_citations_has_no_reference_list() {
    let agent = EditingAgent::new(CompletionService::new(Arc::new(MockLlm::new(["Polished."]))));
    let (edited, _) = agent.edit_content("Draft.", &[], ContentType::Report, CitationFormat::Apa).await.unwrap();
    assert_eq!(edited, "Polished.");
}

#[tokio::test]
async fn fact_check_passes_on_verified() {
    let llm = Arc::new(MockLlm::new(["VERIFIED: All claims are supported."]));
    let agent = EditingAgent::new(CompletionService::new(llm.clone()));
    let (check, step) = agent.fact_check("Body", &[citation("Brief")]).await;
    assert!(check.verified);
    assert!(check.issues.is_empty());
    assert_eq!(step.step_type, "fact_checking");

    let request = &llm.requests()[0];
    assert_eq!(request.temperature, Some(FACT_CHECK_TEMPERATURE));
    assert!(request.messages.last().unwrap().content.contains("[1] Brief: Brief excerpt"));
}

#[tokio::test]
async fn fact_check_error_does_not_fail() {
    let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::Timeout("slow".into()))]));
    let agent = EditingAgent::new(CompletionService::new(llm));
    let (check, step) = agent.fact_check("Body", &[]).await;
    assert!(!check.verified);
    assert!(check.issues[0].starts_with("Fact-check error:"));
    assert!(step.error.is_some());
}
