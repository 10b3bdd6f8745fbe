//! Report rendering for publishing: markdown for SharePoint files, HTML for
//! Teams channel messages.

use std::fmt::Write;

use super::citation::{reference_entries, reference_header};
use crate::models::{Citation, ContentSection, Report, SectionKind};

/// Markdown document: title, executive summary, sections in order, then the
/// reference list in the report's citation style.
#[must_use]
pub fn render_markdown(report: &Report) -> String {
    let mut out = format!("# {}\n", report.title);
    if let Some(summary) = report.executive_summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = write!(out, "\n## Executive Summary\n\n{}\n", summary.trim());
    }
    for section in ordered(report) {
        let _ = write!(out, "\n## {}\n\n", section.title);
        match (section.kind, section.rows.is_empty()) {
            (SectionKind::Table, false) => out.push_str(&markdown_table(&section.rows)),
            _ => {
                out.push_str(section.content.trim());
                out.push('\n');
            }
        }
    }
    let entries = reference_entries(&all_citations(report), report.citation_format);
    if !entries.is_empty() {
        let _ = write!(out, "\n## {}\n\n", reference_header(report.citation_format));
        for entry in entries {
            let _ = writeln!(out, "- {entry}");
        }
    }
    out
}

/// Header row first; short rows are padded to the header width.
#[must_use]
pub fn markdown_table(rows: &[Vec<String>]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    let width = header.len();
    let line = |row: &[String]| {
        let mut cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
        cells.resize(width, String::new());
        format!("| {} |\n", cells.join(" | "))
    };
    let mut out = line(header);
    out.push_str(&format!("|{}\n", " --- |".repeat(width)));
    for row in &rows[1..] {
        out.push_str(&line(row));
    }
    out
}

/// Teams message body. Text is escaped; paragraphs become `<p>` elements.
#[must_use]
pub fn render_teams_html(report: &Report) -> String {
    let mut out = format!("<h1>{}</h1>", escape_html(&report.title));
    if let Some(summary) = report.executive_summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str("<h2>Executive Summary</h2>");
        out.push_str(&paragraphs_html(summary));
    }
    for section in ordered(report) {
        let _ = write!(out, "<h2>{}</h2>", escape_html(&section.title));
        match (section.kind, section.rows.is_empty()) {
            (SectionKind::Table, false) => out.push_str(&table_html(&section.rows)),
            _ => out.push_str(&paragraphs_html(&section.content)),
        }
    }
    if let Some(url) = &report.sharepoint_url {
        let _ = write!(out, "<p><a href=\"{0}\">{0}</a></p>", escape_html(url));
    }
    out
}

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn paragraphs_html(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect()
}

fn table_html(rows: &[Vec<String>]) -> String {
    let mut out = String::from("<table>");
    for (i, row) in rows.iter().enumerate() {
        let tag = if i == 0 { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<{tag}>{}</{tag}>", escape_html(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// Report-level citations followed by every section's, before dedupe.
fn all_citations(report: &Report) -> Vec<Citation> {
    report
        .citations
        .iter()
        .chain(report.sections.iter().flat_map(|s| s.citations.iter()))
        .cloned()
        .collect()
}

fn ordered(report: &Report) -> Vec<&ContentSection> {
    let mut sections: Vec<&ContentSection> = report.sections.iter().collect();
    sections.sort_by_key(|s| s.order);
    sections
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
