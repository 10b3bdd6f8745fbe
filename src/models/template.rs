//! Document templates: a named starting point that fixes the content type
//! and adds structural guidance to the planning prompt.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::report::ContentType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub content_type: ContentType,
    /// Extra planning instructions appended to the planning prompt.
    #[serde(default)]
    pub guidance: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse template file {path}: {source}")]
    Parse { path: String, source: serde_yaml::Error },

    #[error("duplicate template id '{0}'")]
    DuplicateId(String),

    #[error("template '{0}' has a blank id, name or category")]
    Incomplete(String),
}

#[derive(Deserialize)]
struct TemplateFile {
    templates: Vec<Template>,
}

/// Load a YAML template catalog (`templates:` list at the top level).
///
/// # Errors
///
/// Returns a [`TemplateError`] when the file cannot be read or parsed, or an
/// entry has a blank or duplicate id.
pub fn load_templates(path: &Path) -> Result<Vec<Template>, TemplateError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Read { path: display.clone(), source })?;
    parse_templates(&raw).map_err(|e| match e {
        TemplateError::Parse { source, .. } => TemplateError::Parse { path: display, source },
        other => other,
    })
}

/// Parse a YAML template catalog from a string.
///
/// # Errors
///
/// See [`load_templates`].
pub fn parse_templates(raw: &str) -> Result<Vec<Template>, TemplateError> {
    let file: TemplateFile =
        serde_yaml::from_str(raw).map_err(|source| TemplateError::Parse { path: "<inline>".into(), source })?;
    let mut seen = std::collections::HashSet::new();
    for template in &file.templates {
        if [&template.id, &template.name, &template.category]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err(TemplateError::Incomplete(template.id.clone()));
        }
        if !seen.insert(template.id.as_str()) {
            return Err(TemplateError::DuplicateId(template.id.clone()));
        }
    }
    Ok(file.templates)
}

fn template(id: &str, name: &str, category: &str, description: &str, content_type: ContentType, guidance: &str) -> Template {
    Template {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        description: description.into(),
        content_type,
        guidance: guidance.into(),
    }
}

/// Catalog shipped with the service.
#[must_use]
pub fn builtin_templates() -> Vec<Template> {
    vec![
        template(
            "quarterly-business-review",
            "Quarterly Business Review",
            "Business",
            "Performance summary with KPIs, wins, risks and next-quarter priorities.",
            ContentType::Report,
            "Sections: Highlights, KPI Review, Wins, Risks and Issues, Next Quarter Priorities.",
        ),
        template(
            "market-analysis",
            "Market Analysis",
            "Research",
            "Market size, competitors, trends and opportunities for a segment.",
            ContentType::Report,
            "Sections: Market Overview, Competitive Landscape, Trends, Opportunities, Recommendations.",
        ),
        template(
            "executive-briefing",
            "Executive Briefing",
            "Business",
            "A short decision-oriented brief for senior leadership.",
            ContentType::Summary,
            "Keep it to three or four sections. Lead with the decision needed.",
        ),
        template(
            "product-launch",
            "Product Launch Announcement",
            "Marketing",
            "Launch copy covering the problem, the product and a call to action.",
            ContentType::MarketingCopy,
            "Sections: The Problem, Introducing the Product, Key Benefits, Call to Action.",
        ),
        template(
            "team-update-email",
            "Team Update Email",
            "Communication",
            "Internal update email summarizing progress and asks.",
            ContentType::Email,
            "Use the title as the subject line. Sections: Summary, Progress, Asks.",
        ),
        template(
            "training-deck",
            "Training Presentation",
            "Training",
            "Slide-by-slide outline for an internal training session.",
            ContentType::Presentation,
            "One section per slide, five to seven slides.",
        ),
    ]
}
