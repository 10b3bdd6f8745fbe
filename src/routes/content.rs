//! Content routes: generation, the caller's report library, markdown export.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use super::auth::AuthUser;
use super::json_body;
use crate::error::ApiError;
use crate::models::{ContentStatus, ContentType, GenerationRequest, GenerationResponse, Report};
use crate::services::catalog::{DEFAULT_PAGE_LIMIT, filter_reports, paginate, parse_status_filter};
use crate::services::render::render_markdown;
use crate::state::AppState;

/// Tokens held against the caller's budget per requested word while a
/// generation runs; settled to actual usage afterwards.
pub const RESERVED_TOKENS_PER_WORD: u64 = 4;

// =============================================================================
// GENERATE
// =============================================================================

/// `POST /content/generate`: run the full pipeline for one prompt.
///
/// One generation per caller at a time; a second request while the first is
/// pending is refused with 409. Requests that fail validation are rejected
/// before they count against the caller's rate limit or token budget.
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let req = json_body(payload)?;
    let Some(service) = state.generation.clone() else {
        return Err(ApiError::NotConfigured("LLM provider".into()));
    };
    req.validate(service.options().max_words_limit).map_err(ApiError::Validation)?;
    if let Some(id) = req.template_id.as_deref() {
        if state.templates.get(id.trim()).is_none() {
            return Err(ApiError::NotFound(format!("template {id}")));
        }
    }

    let client_key = auth.client_key().to_string();
    let flight_key = format!("generate:{client_key}");
    let _guard = state
        .inflight
        .try_acquire(flight_key.clone())
        .ok_or_else(|| ApiError::InFlight(flight_key))?;

    state.rate_limiter.check_and_record(&client_key)?;
    let reservation = state
        .rate_limiter
        .reserve(&client_key, u64::from(req.max_words) * RESERVED_TOKENS_PER_WORD)?;

    match service.generate(&auth.user, req).await {
        Ok(report) => {
            reservation.settle(report.total_tokens_used);
            Ok(Json(GenerationResponse::completed(report)))
        }
        Err(err) => {
            if let Some(id) = err.report_id() {
                if let Some(failed) = state.store.get(id).await {
                    reservation.settle(failed.total_tokens_used);
                }
            }
            Err(err.into())
        }
    }
}

// =============================================================================
// REPORT LIBRARY
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One row of the report list.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub title: String,
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub word_count: usize,
    pub citations: usize,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharepoint_url: Option<String>,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            content_type: report.content_type,
            status: report.status,
            word_count: report.word_count(),
            citations: report.total_citations(),
            tags: report.tags.clone(),
            created_at: report.created_at,
            sharepoint_url: report.sharepoint_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub reports: Vec<ReportSummary>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// `GET /content/reports`: the caller's reports, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportList>, ApiError> {
    let status = parse_status_filter(query.status.as_deref()).map_err(|msg| ApiError::invalid("status", msg))?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let owned = state.store.list_owned(&auth.user.email).await;
    let matching = filter_reports(&owned, query.q.as_deref(), status);
    let total = matching.len();
    let reports = paginate(matching, limit, offset).into_iter().map(ReportSummary::from).collect();
    Ok(Json(ReportList { reports, total, limit, offset }))
}

async fn owned_report(state: &AppState, auth: &AuthUser, id: &str) -> Result<Report, ApiError> {
    state
        .store
        .get_owned(id, &auth.user.email)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("report {id}")))
}

/// `GET /content/report/{id}`
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    owned_report(&state, &auth, &id).await.map(Json)
}

/// `GET /content/report/{id}/markdown`
pub async fn report_markdown(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let report = owned_report(&state, &auth, &id).await?;
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], render_markdown(&report)).into_response())
}

/// `DELETE /content/report/{id}`
pub async fn delete_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .remove_owned(&id, &auth.user.email)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("report {id}")))?;
    tracing::info!(report_id = %id, user = %auth.user.email, "report deleted");
    Ok(Json(json!({ "success": true, "message": format!("Report {id} deleted") })))
}

/// `GET /content/health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let generation = state.generation.as_ref().map(|g| g.options());
    Json(json!({
        "status": if generation.is_some() { "healthy" } else { "degraded" },
        "service": "content-generation",
        "llm_model": state.integrations.llm_model,
        "search_backend": state.integrations.search_backend,
        "max_words_limit": state.settings.max_words_limit(),
        "default_citation_format": state.settings.citation_format,
        "fact_check_enabled": generation.is_some_and(|o| o.enable_fact_check),
        "agents": ["planning", "research", "drafting", "editing"],
    }))
}
