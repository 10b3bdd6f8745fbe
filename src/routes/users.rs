//! Current-user route.

use axum::response::Json;

use super::auth::AuthUser;
use crate::models::User;

/// `GET /users/me`: the principal the request was authenticated as.
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}
