//! Publishing request/response bodies for SharePoint and Teams.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

pub const MAX_FILE_NAME_CHARS: usize = 255;

/// Characters SharePoint refuses in names. `#`, `%` and `?` would also be
/// read as URL delimiters in the Graph drive-item path.
pub const RESERVED_NAME_CHARS: [char; 10] = ['"', '*', ':', '<', '>', '?', '|', '#', '%', '\\'];

/// Body of `POST /publish/sharepoint`.
///
/// When `report_id` is set and `content` is blank, the stored report is
/// rendered to markdown and uploaded instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointPublishRequest {
    pub file_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub drive_id: Option<String>,
    #[serde(default)]
    pub report_id: Option<String>,
}

impl SharePointPublishRequest {
    /// # Errors
    ///
    /// Returns one [`FieldError`] per violated rule.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = self.file_name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("file_name", "must not be empty"));
        } else if name.chars().count() > MAX_FILE_NAME_CHARS {
            errors.push(FieldError::new("file_name", format!("must be at most {MAX_FILE_NAME_CHARS} characters")));
        } else if name.contains(['/', '\\']) || name == "." || name == ".." {
            errors.push(FieldError::new("file_name", "must be a plain file name"));
        } else if name.contains(RESERVED_NAME_CHARS) {
            errors.push(FieldError::new("file_name", "must not contain \" * : < > ? | # % characters"));
        }
        if self.folder_path.split(['/', '\\']).any(|segment| segment == "..") {
            errors.push(FieldError::new("folder_path", "must not contain '..' segments"));
        } else if self.folder_path.split(['/', '\\']).any(|segment| segment.contains(RESERVED_NAME_CHARS)) {
            errors.push(FieldError::new("folder_path", "must not contain \" * : < > ? | # % characters"));
        }
        if self.content.trim().is_empty() && self.report_id.is_none() {
            errors.push(FieldError::new("content", "content or report_id is required"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointPublishResponse {
    pub success: bool,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub message: String,
}

/// Body of `POST /publish/teams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsPostRequest {
    pub team_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub report_id: Option<String>,
}

impl TeamsPostRequest {
    /// # Errors
    ///
    /// Returns one [`FieldError`] per violated rule.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.team_id.trim().is_empty() {
            errors.push(FieldError::new("team_id", "must not be empty"));
        }
        if self.channel_id.trim().is_empty() {
            errors.push(FieldError::new("channel_id", "must not be empty"));
        }
        if self.message.trim().is_empty() && self.report_id.is_none() {
            errors.push(FieldError::new("message", "message or report_id is required"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsPostResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    pub message: String,
}
