//! API error taxonomy.
//!
//! DESIGN
//! ======
//! Every service error implements [`ErrorCode`] so it carries a grepable code
//! and a retryable flag. Handlers convert service errors into [`ApiError`],
//! which owns the HTTP status mapping and the JSON failure body. The body is
//! the same shape for every failure so callers can branch on `code` and
//! `retryable` without parsing messages.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

// =============================================================================
// ERROR CODE
// =============================================================================

/// Grepable error code and retryable flag for structured error bodies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// A single validation failure, tied to the request field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

// =============================================================================
// API ERROR
// =============================================================================

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is already in progress")]
    InFlight(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("upstream failure: {message}")]
    Upstream { message: String, retryable: bool },

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Wrap a failed call to an external collaborator (LLM, search, Graph).
    pub fn upstream(err: &(impl ErrorCode + ?Sized), timed_out: bool) -> Self {
        if timed_out {
            Self::UpstreamTimeout(err.to_string())
        } else {
            Self::Upstream { message: err.to_string(), retryable: err.retryable() }
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InFlight(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::InFlight(_) => "E_IN_FLIGHT",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::UpstreamTimeout(_) => "E_UPSTREAM_TIMEOUT",
            Self::Upstream { .. } => "E_UPSTREAM",
            Self::NotConfigured(_) => "E_NOT_CONFIGURED",
            Self::Internal(_) => "E_INTERNAL",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::InFlight(_) | Self::RateLimited(_) | Self::UpstreamTimeout(_) => true,
            Self::Upstream { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// JSON failure body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        let errors = match err {
            ApiError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        Self { success: false, code: err.error_code(), message: err.to_string(), retryable: err.retryable(), errors }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
