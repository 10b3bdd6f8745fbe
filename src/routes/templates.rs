//! Template catalog routes.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::models::Template;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub templates: Vec<Template>,
    pub categories: Vec<String>,
    pub total: usize,
}

/// `GET /templates?q=&category=`. A missing or `all` category matches every
/// template.
pub async fn list_templates(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<TemplateQuery>,
) -> Json<TemplateList> {
    let templates: Vec<Template> = state
        .templates
        .search(query.q.as_deref(), query.category.as_deref())
        .into_iter()
        .cloned()
        .collect();
    let categories = state.templates.categories().into_iter().map(str::to_string).collect();
    Json(TemplateList { total: templates.len(), templates, categories })
}

/// `GET /templates/{id}`
pub async fn get_template(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    state
        .templates
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("template {id}")))
}
