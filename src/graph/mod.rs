//! Microsoft Graph publishing.
//!
//! DESIGN
//! ======
//! Publishing goes through the [`Publisher`] trait so the publish service can
//! be exercised without a tenant. [`client::GraphClient`] is the production
//! implementation: app-only (client credentials) auth against Entra ID,
//! SharePoint drive uploads, and Teams channel messages.

pub mod client;

use secrecy::SecretString;
use serde::Serialize;

use crate::error::ErrorCode;

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph publishing not configured: {0}")]
    NotConfigured(String),

    #[error("graph authentication failed: {0}")]
    Auth(String),

    #[error("graph request failed: {0}")]
    Request(String),

    #[error("graph request timed out: {0}")]
    Timeout(String),

    #[error("graph returned status {status}: {message}")]
    Response { status: u16, message: String },

    #[error("graph response parse failed: {0}")]
    Parse(String),

    #[error("failed to build http client: {0}")]
    HttpClientBuild(String),
}

impl GraphError {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout(err.to_string()) } else { Self::Request(err.to_string()) }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Response { status: 408 | 504, .. })
    }
}

impl ErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "E_GRAPH_NOT_CONFIGURED",
            Self::Auth(_) => "E_GRAPH_AUTH",
            Self::Request(_) => "E_GRAPH_REQUEST",
            Self::Timeout(_) => "E_GRAPH_TIMEOUT",
            Self::Response { .. } => "E_GRAPH_RESPONSE",
            Self::Parse(_) => "E_GRAPH_PARSE",
            Self::HttpClientBuild(_) => "E_GRAPH_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub authority: String,
    pub api_base: String,
    pub scope: String,
    pub site_id: Option<String>,
    pub drive_id: Option<String>,
}

impl GraphConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `None` unless tenant, client id and client secret are all present.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let tenant_id = get("GRAPH_TENANT_ID")?;
        let client_id = get("GRAPH_CLIENT_ID")?;
        let client_secret = SecretString::new(get("GRAPH_CLIENT_SECRET")?);
        Some(Self {
            tenant_id,
            client_id,
            client_secret,
            authority: get("GRAPH_AUTHORITY")
                .unwrap_or_else(|| DEFAULT_AUTHORITY.into())
                .trim_end_matches('/')
                .to_string(),
            api_base: get("GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            scope: get("GRAPH_SCOPES").unwrap_or_else(|| DEFAULT_SCOPE.into()),
            site_id: get("SHAREPOINT_SITE_ID"),
            drive_id: get("SHAREPOINT_DRIVE_ID"),
        })
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// SharePoint document library to upload into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveTarget {
    pub site_id: String,
    pub drive_id: String,
}

impl DriveTarget {
    /// Request overrides win over configured defaults; both ids are required.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotConfigured`] when either id is missing.
    pub fn resolve(
        site_id: Option<&str>,
        drive_id: Option<&str>,
        default_site: Option<&str>,
        default_drive: Option<&str>,
    ) -> Result<Self, GraphError> {
        let pick = |given: Option<&str>, fallback: Option<&str>| {
            given
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .or(fallback)
                .map(ToString::to_string)
        };
        match (pick(site_id, default_site), pick(drive_id, default_drive)) {
            (Some(site_id), Some(drive_id)) => Ok(Self { site_id, drive_id }),
            _ => Err(GraphError::NotConfigured("SharePoint site_id and drive_id must be configured".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub item_id: Option<String>,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedMessage {
    pub message_id: Option<String>,
    pub web_url: Option<String>,
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Upload `content` as `folder_path/file_name` in the target drive.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the upload fails.
    async fn upload_file(
        &self,
        target: &DriveTarget,
        folder_path: &str,
        file_name: &str,
        content: &str,
    ) -> Result<UploadedFile, GraphError>;

    /// Post an HTML message to a Teams channel.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the post fails.
    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        html: &str,
        subject: Option<&str>,
    ) -> Result<PostedMessage, GraphError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
