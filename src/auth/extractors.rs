use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use tracing::warn;

use crate::auth::store::User;
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_id";

/// Resolves the session cookie to its user.
///
/// Rejects with 403 when the cookie is missing or no longer maps to a user.
pub struct SessionUser(pub User);

/// Pull a named value out of a `Cookie` request header.
pub(crate) fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = parts
            .headers
            .get(header::COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| cookie_value(h, SESSION_COOKIE));

        let user = state
            .auth
            .user_by_session(session_id)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .ok_or_else(|| {
                warn!("request with missing or unknown session cookie");
                (StatusCode::FORBIDDEN, "Invalid session".to_string())
            })?;

        Ok(SessionUser(user))
    }
}
