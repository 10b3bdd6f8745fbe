//! SharePoint and Teams publishing.
//!
//! DESIGN
//! ======
//! The service validates the request, claims an in-flight key for the
//! destination so duplicate publishes are refused rather than raced, then
//! hands the content to a [`Publisher`]. When a request names a stored
//! report, that report must belong to the caller; blank content is filled
//! by rendering the report, and a successful publish marks it published.

use std::sync::Arc;

use crate::error::{ErrorCode, FieldError};
use crate::graph::{DriveTarget, GraphError, Publisher};
use crate::models::{
    Report, SharePointPublishRequest, SharePointPublishResponse, TeamsPostRequest, TeamsPostResponse, User,
};

use super::inflight::InFlight;
use super::render::{render_markdown, render_teams_html};
use super::store::ReportStore;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("publish request validation failed")]
    Invalid(Vec<FieldError>),

    #[error("report {0}")]
    ReportNotFound(String),

    #[error("publish to {0}")]
    InFlight(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ErrorCode for PublishError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "E_NOT_CONFIGURED",
            Self::Invalid(_) => "E_VALIDATION",
            Self::ReportNotFound(_) => "E_NOT_FOUND",
            Self::InFlight(_) => "E_IN_FLIGHT",
            Self::Graph(err) => err.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::InFlight(_) => true,
            Self::Graph(err) => err.retryable(),
            _ => false,
        }
    }
}

pub struct PublishService {
    publisher: Option<Arc<dyn Publisher>>,
    default_site: Option<String>,
    default_drive: Option<String>,
    store: Arc<ReportStore>,
    inflight: InFlight,
}

impl PublishService {
    pub fn new(
        publisher: Option<Arc<dyn Publisher>>,
        default_site: Option<String>,
        default_drive: Option<String>,
        store: Arc<ReportStore>,
        inflight: InFlight,
    ) -> Self {
        Self { publisher, default_site, default_drive, store, inflight }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.publisher.is_some()
    }

    /// Upload a markdown file to SharePoint.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the request is invalid, Graph is not
    /// configured, the same file is already being uploaded, the referenced
    /// report is not the caller's, or the upload fails.
    pub async fn publish_sharepoint(
        &self,
        user: &User,
        req: SharePointPublishRequest,
    ) -> Result<SharePointPublishResponse, PublishError> {
        req.validate().map_err(PublishError::Invalid)?;
        let publisher = self.publisher()?;
        let target = DriveTarget::resolve(
            req.site_id.as_deref(),
            req.drive_id.as_deref(),
            self.default_site.as_deref(),
            self.default_drive.as_deref(),
        )?;

        let file_name = req.file_name.trim();
        let folder = req.folder_path.trim().trim_matches('/');
        let key = format!("sharepoint:{}/{folder}/{file_name}", target.drive_id);
        let _guard = self.inflight.try_acquire(key.clone()).ok_or(PublishError::InFlight(key))?;

        let report = self.owned_report(user, req.report_id.as_deref()).await?;
        let content = match &report {
            Some(report) if req.content.trim().is_empty() => render_markdown(report),
            _ => req.content.clone(),
        };

        let uploaded = publisher.upload_file(&target, folder, file_name, &content).await?;
        tracing::info!(
            user = %user.email,
            file_name,
            folder,
            bytes = content.len(),
            item_id = ?uploaded.item_id,
            "published file to sharepoint"
        );

        if let Some(report) = report {
            let url = uploaded.web_url.clone();
            self.store.update(&report.id, |r| r.mark_published(url, None)).await;
        }

        Ok(SharePointPublishResponse {
            success: true,
            file_name: file_name.to_string(),
            web_url: uploaded.web_url,
            item_id: uploaded.item_id,
            message: format!("Uploaded {file_name} to SharePoint"),
        })
    }

    /// Post an HTML message to a Teams channel.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] under the same conditions as
    /// [`Self::publish_sharepoint`].
    pub async fn post_teams(&self, user: &User, req: TeamsPostRequest) -> Result<TeamsPostResponse, PublishError> {
        req.validate().map_err(PublishError::Invalid)?;
        let publisher = self.publisher()?;

        let team_id = req.team_id.trim();
        let channel_id = req.channel_id.trim();
        let key = format!("teams:{team_id}/{channel_id}");
        let _guard = self.inflight.try_acquire(key.clone()).ok_or(PublishError::InFlight(key))?;

        let report = self.owned_report(user, req.report_id.as_deref()).await?;
        let (html, subject) = match &report {
            Some(report) if req.message.trim().is_empty() => {
                (render_teams_html(report), req.subject.clone().or_else(|| Some(report.title.clone())))
            }
            _ => (req.message.clone(), req.subject.clone()),
        };

        let posted = publisher
            .post_channel_message(team_id, channel_id, &html, subject.as_deref())
            .await?;
        tracing::info!(user = %user.email, team_id, channel_id, message_id = ?posted.message_id, "posted message to teams");

        if let Some(report) = report {
            let channel = format!("{team_id}/{channel_id}");
            self.store.update(&report.id, |r| r.mark_published(None, Some(channel))).await;
        }

        Ok(TeamsPostResponse {
            success: true,
            message_id: posted.message_id,
            web_url: posted.web_url,
            message: "Posted message to Teams channel".into(),
        })
    }

    fn publisher(&self) -> Result<&Arc<dyn Publisher>, PublishError> {
        self.publisher
            .as_ref()
            .ok_or_else(|| PublishError::NotConfigured("Microsoft Graph publishing".into()))
    }

    async fn owned_report(&self, user: &User, report_id: Option<&str>) -> Result<Option<Report>, PublishError> {
        let Some(id) = report_id else {
            return Ok(None);
        };
        self.store
            .get_owned(id, &user.email)
            .await
            .map(Some)
            .ok_or_else(|| PublishError::ReportNotFound(id.to_string()))
    }
}

#[cfg(test)]
#[path = "publish_test.rs"]
mod tests;
