use serde::{Deserialize, Serialize};

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl User {
    /// Placeholder principal used when the auth gate is disabled.
    #[must_use]
    pub fn anonymous(client_key: &str) -> Self {
        Self { name: "Anonymous".into(), email: format!("{client_key}@anonymous.local"), company: None }
    }
}
