//! Bearer-token authentication.
//!
//! DESIGN
//! ======
//! `AUTH_TOKENS` maps opaque tokens to principals. Only SHA-256 digests of
//! the tokens are kept in memory. When the variable is unset the gate is
//! disabled and every request runs as an anonymous principal keyed by the
//! `X-Client-Id` header, so rate limits and report ownership still apply
//! per caller.

use std::collections::HashMap;

use axum::extract::FromRef;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use sha2::{Digest, Sha256};

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const ANONYMOUS_CLIENT: &str = "anonymous";
const MAX_CLIENT_ID_CHARS: usize = 64;

#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

// =============================================================================
// TOKEN TABLE
// =============================================================================

/// Token digest to principal.
#[derive(Debug, Default)]
pub struct AuthTokens {
    users: HashMap<String, User>,
}

impl AuthTokens {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Parse a comma-separated `token:email:name[:company]` list.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming `AUTH_TOKENS` for a malformed or
    /// duplicated entry, or when the list is empty.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut users = HashMap::new();
        for (index, entry) in raw.split(',').map(str::trim).filter(|e| !e.is_empty()).enumerate() {
            let parts: Vec<&str> = entry.splitn(4, ':').map(str::trim).collect();
            let (token, email, name) = match parts.as_slice() {
                [token, email, name, ..] if !token.is_empty() && email.contains('@') && !name.is_empty() => {
                    (*token, *email, *name)
                }
                _ => {
                    return Err(ConfigError::invalid(
                        "AUTH_TOKENS",
                        format!("entry {} must be token:email:name[:company]", index + 1),
                    ));
                }
            };
            let company = parts.get(3).filter(|c| !c.is_empty()).map(ToString::to_string);
            let user = User { name: name.to_string(), email: email.to_ascii_lowercase(), company };
            if users.insert(hash_token(token), user).is_some() {
                return Err(ConfigError::invalid("AUTH_TOKENS", format!("entry {} repeats a token", index + 1)));
            }
        }
        if users.is_empty() {
            return Err(ConfigError::invalid("AUTH_TOKENS", "no tokens listed"));
        }
        Ok(Self { users })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.users.is_empty()
    }

    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&User> {
        self.users.get(&hash_token(token))
    }
}

/// Sanitized `X-Client-Id`, or [`ANONYMOUS_CLIENT`].
fn client_id(parts: &Parts) -> String {
    parts
        .headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| {
            !v.is_empty()
                && v.len() <= MAX_CLIENT_ID_CHARS
                && v.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated (or, with auth disabled, anonymous) caller.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    /// Key for rate limits and in-flight guards.
    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.user.email
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        if !app_state.auth.enabled() {
            return Ok(Self { user: User::anonymous(&client_id(parts)) });
        }

        let header = parts.headers.typed_get::<Authorization<Bearer>>().ok_or(ApiError::Unauthorized)?;
        let user = app_state.auth.lookup(header.token()).ok_or_else(|| {
            tracing::debug!("rejected unknown bearer token");
            ApiError::Unauthorized
        })?;
        Ok(Self { user: user.clone() })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
