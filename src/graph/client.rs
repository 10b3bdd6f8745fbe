//! Microsoft Graph REST client.
//!
//! Tokens come from the client-credentials flow and are cached until five
//! minutes before they expire. Every call retries throttling and server
//! errors up to three times.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{DriveTarget, GraphConfig, GraphError, PostedMessage, Publisher, UploadedFile};
use crate::retry::{Backoff, retry_async};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(10));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

struct CachedToken {
    value: SecretString,
    refresh_at: Instant,
}

pub struct GraphClient {
    http: reqwest::Client,
    config: GraphConfig,
    token: Mutex<Option<CachedToken>>,
}

impl GraphClient {
    /// # Errors
    ///
    /// Returns [`GraphError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GraphError::HttpClientBuild(e.to_string()))?;
        tracing::info!(tenant = %config.tenant_id, "graph client initialized");
        Ok(Self { http, config, token: Mutex::new(None) })
    }

    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Bearer token for Graph calls, fetched when missing or near expiry.
    async fn access_token(&self) -> Result<String, GraphError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.expose_secret().clone());
        }

        tracing::debug!("acquiring graph access token");
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
            ("scope", self.config.scope.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .http
            .post(self.config.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| GraphError::Auth(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| GraphError::Auth(e.to_string()))?;
        if status != 200 {
            return Err(GraphError::Auth(error_message(&text).unwrap_or_else(|| format!("token endpoint returned {status}"))));
        }

        let token = parse_token_response(&text)?;
        let refresh_at = Instant::now() + Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let value = token.access_token.clone();
        *cached = Some(CachedToken { value: SecretString::new(token.access_token), refresh_at });
        tracing::info!(expires_in = token.expires_in, "graph access token acquired");
        Ok(value)
    }

    async fn send_once(&self, request: &GraphRequest<'_>) -> Result<Value, GraphError> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.config.api_base, request.path.trim_start_matches('/'));
        let builder = match request.body {
            Body::Text(text) => self
                .http
                .put(url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(text.to_string()),
            Body::Json(value) => self.http.post(url).json(value),
        };

        let response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GraphError::from_transport(&e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GraphError::from_transport(&e))?;
        if !(200..300).contains(&status) {
            let message = error_message(&text).unwrap_or_else(|| text.chars().take(200).collect());
            return Err(GraphError::Response { status, message });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| GraphError::Parse(e.to_string()))
    }

    async fn send(&self, label: &str, request: GraphRequest<'_>) -> Result<Value, GraphError> {
        retry_async(label, MAX_ATTEMPTS, RETRY_BACKOFF, || self.send_once(&request)).await
    }
}

#[async_trait::async_trait]
impl Publisher for GraphClient {
    async fn upload_file(
        &self,
        target: &DriveTarget,
        folder_path: &str,
        file_name: &str,
        content: &str,
    ) -> Result<UploadedFile, GraphError> {
        let path = upload_path(&target.drive_id, folder_path, file_name);
        tracing::info!(site_id = %target.site_id, %file_name, folder = %folder_path, "uploading to sharepoint");
        let response = self.send("graph.upload", GraphRequest { path: &path, body: Body::Text(content) }).await?;
        let uploaded = UploadedFile { item_id: str_field(&response, "id"), web_url: str_field(&response, "webUrl") };
        tracing::info!(%file_name, web_url = ?uploaded.web_url, "sharepoint upload complete");
        Ok(uploaded)
    }

    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        html: &str,
        subject: Option<&str>,
    ) -> Result<PostedMessage, GraphError> {
        let path = format!("teams/{team_id}/channels/{channel_id}/messages");
        let payload = message_payload(html, subject);
        tracing::info!(%team_id, %channel_id, "posting to teams channel");
        let response = self.send("graph.teams", GraphRequest { path: &path, body: Body::Json(&payload) }).await?;
        let posted = PostedMessage { message_id: str_field(&response, "id"), web_url: str_field(&response, "webUrl") };
        tracing::info!(message_id = ?posted.message_id, "teams message posted");
        Ok(posted)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

enum Body<'a> {
    Text(&'a str),
    Json(&'a Value),
}

struct GraphRequest<'a> {
    path: &'a str,
    body: Body<'a>,
}

/// Drive-relative upload path; empty folders are omitted and slashes trimmed.
pub(crate) fn upload_path(drive_id: &str, folder_path: &str, file_name: &str) -> String {
    let folder = folder_path.trim_matches(|c| c == '/' || c == '\\');
    if folder.is_empty() {
        format!("drives/{drive_id}/root:/{file_name}:/content")
    } else {
        format!("drives/{drive_id}/root:/{folder}/{file_name}:/content")
    }
}

pub(crate) fn message_payload(html: &str, subject: Option<&str>) -> Value {
    let mut payload = json!({ "body": { "contentType": "html", "content": html } });
    if let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) {
        payload["subject"] = Value::String(subject.to_string());
    }
    payload
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_lifetime")]
    pub expires_in: u64,
}

fn default_lifetime() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

pub(crate) fn parse_token_response(json: &str) -> Result<TokenResponse, GraphError> {
    serde_json::from_str(json).map_err(|e| GraphError::Auth(format!("invalid token response: {e}")))
}

/// Pull a human-readable message from a Graph or Entra error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("error_description"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
