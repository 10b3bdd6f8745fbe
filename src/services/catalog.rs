//! Search and filtering over templates and stored reports.
//!
//! Text queries are case-insensitive substring matches; a blank query
//! matches everything. Category and status filters treat `all` (or no
//! value) as the identity.

use std::path::Path;

use crate::models::template::{TemplateError, builtin_templates, load_templates};
use crate::models::{ContentStatus, Report, Template};

pub const ALL: &str = "all";
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

/// True when `query` is blank or appears in any haystack, ignoring case.
#[must_use]
pub fn matches_query(query: Option<&str>, haystacks: &[&str]) -> bool {
    let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}

fn is_all(filter: Option<&str>) -> Option<&str> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case(ALL))
}

pub fn filter_templates<'a>(templates: &'a [Template], query: Option<&str>, category: Option<&str>) -> Vec<&'a Template> {
    let category = is_all(category);
    templates
        .iter()
        .filter(|t| category.map_or(true, |c| t.category.eq_ignore_ascii_case(c)))
        .filter(|t| matches_query(query, &[t.name.as_str(), t.description.as_str()]))
        .collect()
}

/// Parse a `status` query value; `all` and blank mean no filter.
///
/// # Errors
///
/// Returns a message naming the unknown status.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<ContentStatus>, String> {
    is_all(raw).map(str::parse::<ContentStatus>).transpose()
}

pub fn filter_reports<'a>(
    reports: impl IntoIterator<Item = &'a Report>,
    query: Option<&str>,
    status: Option<ContentStatus>,
) -> Vec<&'a Report> {
    reports
        .into_iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .filter(|r| matches_query(query, &[r.title.as_str(), r.prompt.as_str()]))
        .collect()
}

/// One page of `items`. `limit` is clamped to `1..=100`.
pub fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    items
        .into_iter()
        .skip(offset)
        .take(limit.clamp(1, MAX_PAGE_LIMIT))
        .collect()
}

// =============================================================================
// TEMPLATE CATALOG
// =============================================================================

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    #[must_use]
    pub fn builtin() -> Self {
        Self { templates: builtin_templates() }
    }

    #[must_use]
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// Built-in catalog, or the YAML file at `path` when one is configured.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] when the override file is unusable.
    pub fn load(path: Option<&Path>) -> Result<Self, TemplateError> {
        match path {
            Some(path) => {
                let templates = load_templates(path)?;
                tracing::info!(path = %path.display(), count = templates.len(), "loaded template catalog");
                Ok(Self { templates })
            }
            None => Ok(Self::builtin()),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn search(&self, query: Option<&str>, category: Option<&str>) -> Vec<&Template> {
        filter_templates(&self.templates, query, category)
    }

    /// Distinct categories in catalog order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for template in &self.templates {
            if !categories.contains(&template.category.as_str()) {
                categories.push(&template.category);
            }
        }
        categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
