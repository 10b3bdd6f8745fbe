use super::*;
use crate::models::{CitationFormat, ContentType};

fn report(prompt: &str, status: ContentStatus) -> Report {
    let mut report = Report::new(prompt, ContentType::Report, CitationFormat::Apa);
    report.status = status;
    report
}

#[test]
fn blank_query_matches_everything() {
    assert!(matches_query(None, &["anything"]));
    assert!(matches_query(Some("   "), &["anything"]));
}

#[test]
fn query_is_case_insensitive_substring() {
    assert!(matches_query(Some("MARKET"), &["Quarterly", "A market analysis"]));
    assert!(!matches_query(Some("payroll"), &["Quarterly", "A market analysis"]));
}

#[test]
fn template_search_hits_name_or_description() {
    let catalog = TemplateCatalog::builtin();
    let hits = catalog.search(Some("kpis"), None);
    assert!(hits.iter().any(|t| t.id == "quarterly-business-review"));
    assert!(hits.iter().all(|t| {
        t.name.to_lowercase().contains("kpis") || t.description.to_lowercase().contains("kpis")
    }));
}

#[test]
fn all_category_is_identity() {
    let catalog = TemplateCatalog::builtin();
    assert_eq!(catalog.search(None, Some("all")).len(), catalog.len());
    assert_eq!(catalog.search(None, Some("ALL")).len(), catalog.len());
    assert_eq!(catalog.search(None, None).len(), catalog.len());
}

#[test]
fn category_restricts_results() {
    let catalog = TemplateCatalog::builtin();
    let business = catalog.search(None, Some("business"));
    assert!(!business.is_empty());
    assert!(business.iter().all(|t| t.category == "Business"));
    assert!(business.len() < catalog.len());
}

#[test]
fn categories_are_distinct() {
    let catalog = TemplateCatalog::builtin();
    let categories = catalog.categories();
    assert_eq!(categories.iter().filter(|c| **c == "Business").count(), 1);
}

#[test]
fn get_by_id() {
    let catalog = TemplateCatalog::builtin();
    assert_eq!(catalog.get("market-analysis").map(|t| t.category.as_str()), Some("Research"));
    assert!(catalog.get("missing").is_none());
}

#[test]
fn status_filter_parsing() {
    assert_eq!(parse_status_filter(None).unwrap(), None);
    assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
    assert_eq!(parse_status_filter(Some("Completed")).unwrap(), Some(ContentStatus::Completed));
    assert!(parse_status_filter(Some("archived")).is_err());
}

#[test]
fn reports_filter_by_status_and_query() {
    let reports = vec![
        report("Analyze cloud adoption trends", ContentStatus::Completed),
        report("Summarize cloud spending", ContentStatus::Failed),
        report("Draft the hiring plan", ContentStatus::Completed),
    ];
    let hits = filter_reports(&reports, Some("CLOUD"), None);
    assert_eq!(hits.len(), 2);
    let hits = filter_reports(&reports, Some("cloud"), Some(ContentStatus::Completed));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].prompt, "Analyze cloud adoption trends");
}

#[test]
fn paginate_applies_offset_and_clamps_limit() {
    let items: Vec<u32> = (0..10).collect();
    assert_eq!(paginate(items.clone(), 3, 2), vec![2, 3, 4]);
    assert_eq!(paginate(items.clone(), 0, 0), vec![0]);
    assert!(paginate(items, 5, 20).is_empty());
}

#[test]
fn missing_override_file_fails_to_load() {
    assert!(TemplateCatalog::load(Some(Path::new("/nonexistent/templates.yaml"))).is_err());
    assert_eq!(TemplateCatalog::load(None).unwrap().len(), 6);
}
