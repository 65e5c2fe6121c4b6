use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use mytravel_types::models::Identity;

use crate::error::ApiError;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Identity resolved from the session cookie. Taking this as a handler
/// argument makes the route require a login; rejection is a 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        let identity = state.sessions.resolve(&state.db, &token).await?;
        Ok(CurrentUser(identity))
    }
}
