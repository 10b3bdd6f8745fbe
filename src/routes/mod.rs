//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Service metadata and health live at the root; the API lives under the
//! configured prefix (`/api/v1` by default). Every response carries an
//! `X-Correlation-ID` header, reused from the request when the caller sent
//! one. Requests running past the configured timeout are answered with
//! `E_UPSTREAM_TIMEOUT`. Service errors are converted to [`ApiError`] here so handlers can
//! use `?` throughout.

pub mod auth;
pub mod content;
pub mod publish;
pub mod templates;
pub mod users;

use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::error::ApiError;
use crate::graph::GraphError;
use crate::rate_limit::RateLimitError;
use crate::services::generation::GenerationError;
use crate::services::publish::PublishError;
use crate::state::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/content/generate", post(content::generate))
        .route("/content/reports", get(content::list_reports))
        .route("/content/report/{id}", get(content::get_report).delete(content::delete_report))
        .route("/content/report/{id}/markdown", get(content::report_markdown))
        .route("/content/health", get(content::health))
        .route("/templates", get(templates::list_templates))
        .route("/templates/{id}", get(templates::get_template))
        .route("/publish/sharepoint", post(publish::sharepoint))
        .route("/publish/teams", post(publish::teams))
        .route("/publish/health", get(publish::health))
        .route("/users/me", get(users::me));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
        .nest(&state.settings.api_prefix, api)
        .layer(middleware::from_fn_with_state(state.clone(), request_timeout))
        .layer(cors_layer(&state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(correlation_id))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Fail requests that outlive `REQUEST_TIMEOUT_SECS` with a 504 JSON body.
///
/// The handler future is dropped on expiry; work it owns must tolerate that.
async fn request_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limit = Duration::from_secs(state.settings.request_timeout_secs);
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::UpstreamTimeout(format!("request exceeded {}s", limit.as_secs())).into_response(),
    }
}

/// Echo or mint `X-Correlation-ID`, and log the request under a span
/// carrying it.
async fn correlation_id(mut request: Request, next: Next) -> Response {
    let header = HeaderName::from_static(CORRELATION_HEADER);
    let id = request
        .headers()
        .get(&header)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map_or_else(|| format!("req-{}", uuid::Uuid::new_v4()), ToString::to_string);

    let value = HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("req-invalid"));
    request.headers_mut().insert(header.clone(), value.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("request", correlation_id = %id);
    span.in_scope(|| tracing::debug!(%method, %path, "request started"));

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            %method,
            %path,
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis(),
            "request completed"
        );
    });
    response.headers_mut().insert(header, value);
    response
}

// =============================================================================
// SERVICE ROUTES
// =============================================================================

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let settings = &state.settings;
    Json(json!({
        "name": settings.app_name,
        "version": settings.app_version,
        "environment": settings.environment.as_str(),
        "api_prefix": settings.api_prefix,
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": state.settings.app_name,
        "version": state.settings.app_version,
    }))
}

fn configured(flag: bool) -> &'static str {
    if flag { "configured" } else { "not_configured" }
}

async fn health_detailed(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = &state.integrations;
    let reports_stored = state.store.len().await;
    Json(json!({
        "status": "healthy",
        "service": state.settings.app_name,
        "version": state.settings.app_version,
        "environment": state.settings.environment.as_str(),
        "dependencies": {
            "llm": {
                "status": configured(status.llm_model.is_some()),
                "model": status.llm_model,
            },
            "search": {
                "status": "configured",
                "backend": status.search_backend,
                "top_k": status.search_top_k,
            },
            "graph": { "status": configured(status.graph_configured) },
            "auth": { "status": if state.auth.enabled() { "enabled" } else { "disabled" } },
        },
        "reports_stored": reports_stored,
        "templates": state.templates.len(),
    }))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

/// Unwrap a JSON body, turning rejections into a validation failure.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] naming the body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| ApiError::invalid("body", rejection.body_text()))
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Invalid(fields) => Self::Validation(fields),
            GenerationError::TemplateNotFound(id) => Self::NotFound(format!("template {id}")),
            other => {
                let timed_out = other.is_timeout();
                Self::upstream(&other, timed_out)
            }
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::NotConfigured(what) => Self::NotConfigured(what),
            PublishError::Invalid(fields) => Self::Validation(fields),
            PublishError::ReportNotFound(id) => Self::NotFound(format!("report {id}")),
            PublishError::InFlight(key) => Self::InFlight(format!("publish to {key}")),
            PublishError::Graph(GraphError::NotConfigured(_)) => Self::NotConfigured("SharePoint site and drive".into()),
            PublishError::Graph(graph) => {
                let timed_out = graph.is_timeout();
                Self::upstream(&graph, timed_out)
            }
        }
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::RateLimited(err.to_string())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
