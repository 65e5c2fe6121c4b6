use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;

use mytravel_types::api::{LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest};

use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::identity;
use crate::middleware::CurrentUser;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .db
        .call(move |db| {
            identity::register(db, &req.name, &req.email, &req.password)?;
            Ok(())
        })
        .await?;

    Ok(Json(MessageResponse::new("register success")))
}

/// POST /api/auth/login: verifies credentials and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let auth = state
        .db
        .call(move |db| Ok(identity::authenticate(db, &req.email, &req.password)?))
        .await?;

    let token = state.sessions.create(&state.db, &auth.identity).await?;

    Ok((
        jar.add(state.sessions.cookie(token)),
        Json(LoginResponse {
            message: "login success".into(),
            name: auth.name,
            role: auth.identity.role,
        }),
    ))
}

/// POST /api/auth/logout: always succeeds, even without a live session.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    state.sessions.invalidate(&state.db, token.as_deref()).await?;

    Ok((
        jar.remove(state.sessions.removal_cookie()),
        Json(MessageResponse::new("logout success")),
    ))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: identity.user_id,
        role: identity.role,
    })
}
