use super::*;

fn report() -> Report {
    Report::new("Write a report about renewable energy adoption", ContentType::Report, CitationFormat::Apa)
}

// =========================================================================
// Citation
// =========================================================================

#[test]
fn citation_requires_text_and_source() {
    assert_eq!(Citation::new("", "Doc").unwrap_err(), ModelError::Empty("citation text"));
    assert_eq!(Citation::new("excerpt", "  ").unwrap_err(), ModelError::Empty("citation source"));
    let c = Citation::new("excerpt", "Doc").unwrap();
    assert!((c.relevance_score - 1.0).abs() < f64::EPSILON);
    assert_eq!(c.source_type, "document");
}

#[test]
fn citation_relevance_is_clamped() {
    let c = Citation::new("excerpt", "Doc").unwrap().with_relevance(3.7);
    assert!((c.relevance_score - 1.0).abs() < f64::EPSILON);
    let c = Citation::new("excerpt", "Doc").unwrap().with_relevance(-0.2);
    assert!(c.relevance_score.abs() < f64::EPSILON);
    let c = Citation::new("excerpt", "Doc").unwrap().with_relevance(f64::NAN);
    assert!(c.relevance_score.abs() < f64::EPSILON);
}

#[test]
fn citation_dedupe_key_includes_page() {
    let a = Citation::new("x", "Doc").unwrap().with_page(Some(3));
    let b = Citation::new("x", "Doc").unwrap();
    assert_eq!(a.dedupe_key(), "Doc:3");
    assert_eq!(b.dedupe_key(), "Doc:none");
}

#[test]
fn citation_format_serializes_with_display_names() {
    assert_eq!(serde_json::to_value(CitationFormat::Chicago).unwrap(), "Chicago");
    assert_eq!(serde_json::to_value(CitationFormat::Ieee).unwrap(), "IEEE");
    let parsed: CitationFormat = serde_json::from_str("\"MLA\"").unwrap();
    assert_eq!(parsed, CitationFormat::Mla);
    assert_eq!("chicago".parse::<CitationFormat>().unwrap(), CitationFormat::Chicago);
}

#[test]
fn content_type_uses_snake_case() {
    assert_eq!(serde_json::to_value(ContentType::MarketingCopy).unwrap(), "marketing_copy");
    assert_eq!(ContentType::MarketingCopy.to_string(), "marketing_copy");
}

// =========================================================================
// ContentSection
// =========================================================================

#[test]
fn section_title_bounds() {
    assert_eq!(ContentSection::new(" ", "body", 0).unwrap_err(), ModelError::Empty("section title"));
    let long = "t".repeat(201);
    assert!(matches!(ContentSection::new(long, "body", 0), Err(ModelError::TooLong { max: 200, .. })));
    assert!(ContentSection::new("t".repeat(200), "body", 0).is_ok());
}

#[test]
fn section_word_limit() {
    let content = "word ".repeat(5001);
    assert!(matches!(
        ContentSection::new("Title", content, 0),
        Err(ModelError::TooManyWords { max: 5000, actual: 5001 })
    ));
    assert!(ContentSection::new("Title", "word ".repeat(5000), 0).is_ok());
}

#[test]
fn table_section_carries_rows() {
    let content = "| Region | Share |\n|---|:---:|\n| EU | 42% |\n| US | 21% |";
    let section = ContentSection::new("Market share", content, 0).unwrap();
    assert_eq!(section.kind, SectionKind::Table);
    assert_eq!(section.rows.len(), 3);
    assert_eq!(section.rows[0], vec!["Region", "Share"]);
    assert_eq!(section.rows[2], vec!["US", "21%"]);
}

#[test]
fn prose_with_pipes_stays_narrative() {
    let section = ContentSection::new("Intro", "Costs | benefits\nmore prose", 0).unwrap();
    assert_eq!(section.kind, SectionKind::Narrative);
    assert!(section.rows.is_empty());

    let no_separator = "| a | b |\n| c | d |";
    assert!(parse_markdown_table(no_separator).is_none());
}

// =========================================================================
// Report
// =========================================================================

#[test]
fn new_report_is_draft_with_prompt_title() {
    let r = report();
    assert_eq!(r.status, ContentStatus::Draft);
    assert_eq!(r.title, "Write a report about renewable energy adoption");
    assert!(r.sections.is_empty());
}

#[test]
fn set_title_truncates_and_ignores_blank() {
    let mut r = report();
    r.set_title(&"x".repeat(400));
    assert_eq!(r.title.chars().count(), 300);
    r.set_title("   ");
    assert_eq!(r.title.chars().count(), 300);
}

#[test]
fn add_section_assigns_sequential_order() {
    let mut r = report();
    r.add_section("One", "first body", vec![]).unwrap();
    r.add_section("Two", "second body", vec![]).unwrap();
    assert_eq!(r.sections[0].order, 0);
    assert_eq!(r.sections[1].order, 1);
    assert!(r.add_section("", "x", vec![]).is_err());
    assert_eq!(r.sections.len(), 2);
}

#[test]
fn agent_steps_accumulate_tokens() {
    let mut r = report();
    r.add_agent_step(AgentStep::new("PlanningAgent", "planning", serde_json::json!({})).with_tokens(120));
    r.add_agent_step(AgentStep::new("ResearchAgent", "research", serde_json::json!({})));
    r.add_agent_step(AgentStep::new("DraftingAgent", "drafting", serde_json::json!({})).with_tokens(80));
    assert_eq!(r.total_tokens_used, 200);
    assert_eq!(r.agent_steps.len(), 3);
}

#[test]
fn status_transitions() {
    let mut r = report();
    r.mark_generating();
    assert_eq!(r.status, ContentStatus::Generating);
    r.mark_failed("llm down");
    assert_eq!(r.status, ContentStatus::Failed);
    assert_eq!(r.error.as_deref(), Some("llm down"));
    r.mark_completed();
    assert_eq!(r.status, ContentStatus::Completed);
    assert!(r.error.is_none());
}

#[test]
fn mark_published_keeps_existing_destinations() {
    let mut r = report();
    r.mark_published(Some("https://contoso.sharepoint.com/doc".into()), None);
    r.mark_published(None, Some("team/channel".into()));
    assert_eq!(r.status, ContentStatus::Published);
    assert!(r.published_at.is_some());
    assert_eq!(r.sharepoint_url.as_deref(), Some("https://contoso.sharepoint.com/doc"));
    assert_eq!(r.teams_channel.as_deref(), Some("team/channel"));
}

#[test]
fn totals_include_sections_and_summary() {
    let mut r = report();
    r.executive_summary = Some("three word summary".into());
    let cite = Citation::new("excerpt", "Doc").unwrap();
    r.add_section("One", "four words right here", vec![cite.clone()]).unwrap();
    r.add_citation(cite);
    assert_eq!(r.word_count(), 7);
    assert_eq!(r.total_citations(), 2);
}

#[test]
fn normalize_section_order_is_stable_and_renumbers() {
    let mut r = report();
    r.add_section("A", "a", vec![]).unwrap();
    r.add_section("B", "b", vec![]).unwrap();
    r.add_section("C", "c", vec![]).unwrap();
    r.sections[0].order = 9;
    r.sections[1].order = 4;
    r.sections[2].order = 4;
    r.normalize_section_order();
    let titles: Vec<&str> = r.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["B", "C", "A"]);
    let orders: Vec<usize> = r.sections.iter().map(|s| s.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn report_round_trips_through_json() {
    let mut r = report();
    r.add_section("One", "body", vec![]).unwrap();
    r.mark_published(None, Some("t/c".into()));
    let json = serde_json::to_string(&r).unwrap();
    let back: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, r.id);
    assert_eq!(back.sections.len(), 1);
    assert_eq!(back.status, ContentStatus::Published);
    assert!(back.published_at.is_some());
}
