//! SharePoint and Teams publishing routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde_json::json;

use super::auth::AuthUser;
use super::json_body;
use crate::error::ApiError;
use crate::models::{SharePointPublishRequest, SharePointPublishResponse, TeamsPostRequest, TeamsPostResponse};
use crate::state::AppState;

/// `POST /publish/sharepoint`
pub async fn sharepoint(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SharePointPublishRequest>, JsonRejection>,
) -> Result<Json<SharePointPublishResponse>, ApiError> {
    let req = json_body(payload)?;
    let response = state.publishing.publish_sharepoint(&auth.user, req).await?;
    Ok(Json(response))
}

/// `POST /publish/teams`
pub async fn teams(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<TeamsPostRequest>, JsonRejection>,
) -> Result<Json<TeamsPostResponse>, ApiError> {
    let req = json_body(payload)?;
    let response = state.publishing.post_teams(&auth.user, req).await?;
    Ok(Json(response))
}

/// `GET /publish/health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let configured = state.publishing.is_configured();
    Json(json!({
        "status": if configured { "healthy" } else { "not_configured" },
        "service": "publishing",
        "sharepoint": configured,
        "teams": configured,
    }))
}
