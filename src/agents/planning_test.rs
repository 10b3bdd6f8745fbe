use std::sync::Arc;

use super::*;
use crate::llm::types::LlmError;
use crate::models::template::builtin_templates;
use crate::state::test_helpers::{MockLlm, plan_json};

fn section(title: &str, queries: &[&str], words: u32) -> PlannedSection {
    PlannedSection {
        title: title.into(),
        description: String::new(),
        research_queries: queries.iter().map(ToString::to_string).collect(),
        word_count_target: words,
    }
}

fn plan(sections: Vec<PlannedSection>) -> ContentPlan {
    ContentPlan {
        title: "  Plan  ".into(),
        executive_summary_needed: true,
        overall_strategy: String::new(),
        key_points: vec!["a".into(), " ".into()],
        sections,
    }
}

#[test]
fn missing_fields_take_defaults() {
    let plan: ContentPlan = serde_json::from_str(r#"{"title":"T","sections":[{"title":"Intro"}]}"#).unwrap();
    assert!(plan.executive_summary_needed);
    assert_eq!(plan.sections[0].word_count_target, DEFAULT_SECTION_WORDS);
    assert!(plan.sections[0].research_queries.is_empty());
}

#[test]
fn normalize_drops_blank_sections_and_fills_queries() {
    let plan = plan(vec![section(" ", &["q"], 100), section("Intro", &["", "  "], 100)])
        .normalize(2000)
        .unwrap();
    assert_eq!(plan.title, "Plan");
    assert_eq!(plan.key_points, vec!["a".to_string()]);
    assert_eq!(plan.sections.len(), 1);
    assert_eq!(plan.sections[0].research_queries, vec!["Intro".to_string()]);
}

#[test]
fn normalize_caps_queries_and_raises_tiny_targets() {
    let plan = plan(vec![section("Intro", &["a", "b", "c", "d"], 10)]).normalize(2000).unwrap();
    assert_eq!(plan.sections[0].research_queries.len(), MAX_QUERIES_PER_SECTION);
    assert_eq!(plan.sections[0].word_count_target, MIN_SECTION_WORDS);
}

#[test]
fn normalize_scales_targets_to_max_words() {
    let plan = plan(vec![section("A", &["a"], 600), section("B", &["b"], 400)])
        .normalize(500)
        .unwrap();
    assert_eq!(plan.sections[0].word_count_target, 300);
    assert_eq!(plan.sections[1].word_count_target, 200);
    assert_eq!(plan.total_word_target(), 500);
}

#[test]
fn normalize_rejects_empty_plan() {
    let err = plan(vec![]).normalize(500).unwrap_err();
    assert!(matches!(err, AgentError::InvalidPlan(_)));
}

#[test]
fn prompt_carries_type_guidance_and_template() {
    let templates = builtin_templates();
    let prompt = build_planning_prompt("Q3 review", ContentType::Email, 400, Some(&templates[0]));
    assert!(prompt.contains("User Request: Q3 review"));
    assert!(prompt.contains("Content Type: email"));
    assert!(prompt.contains("For an EMAIL:"));
    assert!(prompt.contains(&format!("Template: {}", templates[0].name)));
}

#[tokio::test]
async fn create_plan_parses_fenced_json() {
    let body = format!("Here is the plan:\n```json\n{}\n```", plan_json(&["Overview", "Findings"]));
    let llm = Arc::new(MockLlm::new([body]));
    let agent = PlanningAgent::new(CompletionService::new(llm.clone()));

    let (plan, step) = agent.create_plan("Review Q3", ContentType::Report, 1000, None).await.unwrap();
    assert_eq!(plan.sections.len(), 2);
    assert_eq!(step.agent_name, AGENT_NAME);
    assert_eq!(step.step_type, "planning");
    assert!(step.tokens_used.unwrap_or(0) > 0);
    assert!(step.error.is_none());
    assert!(llm.requests()[0].system_prompt().contains("valid JSON"));
}

#[tokio::test]
async fn create_plan_failure_carries_step() {
    let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::Timeout("slow".into()))]));
    let agent = PlanningAgent::new(CompletionService::new(llm));

    let failure = agent.create_plan("Review Q3", ContentType::Report, 1000, None).await.unwrap_err();
    assert!(failure.error.is_timeout());
    assert!(failure.step.error.is_some());
}

#[tokio::test]
async fn create_plan_rejects_garbage() {
    let llm = Arc::new(MockLlm::new(["not json at all"]));
    let agent = PlanningAgent::new(CompletionService::new(llm));
    let failure = agent.create_plan("Review Q3", ContentType::Report, 1000, None).await.unwrap_err();
    assert!(matches!(failure.error, AgentError::Completion(_)));
}
