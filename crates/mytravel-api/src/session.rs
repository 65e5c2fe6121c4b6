use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use mytravel_types::models::{Identity, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::DbHandle;

pub const SESSION_COOKIE: &str = "mytravel-session";
pub const SESSION_TTL_HOURS: i64 = 24;

/// Signed cookie payload. `sid` names the server-side session row, which is
/// what logout deletes; the signature only stops forgery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sid: String,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, chrono::Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(secret: &str, ttl: chrono::Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Opens a session for `identity` and returns the cookie value.
    pub async fn create(&self, db: &DbHandle, identity: &Identity) -> ApiResult<String> {
        let sid = Uuid::new_v4().to_string();
        let expires_at = (Utc::now() + self.ttl).timestamp();

        let claims = Claims {
            sid: sid.clone(),
            sub: identity.user_id.clone(),
            role: identity.role,
            exp: expires_at.max(0) as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("failed to sign session: {}", e))?;

        let owner = identity.clone();
        db.call(move |db| {
            db.insert_session(&sid, &owner, expires_at)?;
            Ok(())
        })
        .await?;

        info!("Session opened for user {}", identity.user_id);
        Ok(token)
    }

    /// Maps a cookie value back to its identity. Forged, expired and
    /// logged-out tokens all come back as `Unauthenticated`.
    pub async fn resolve(&self, db: &DbHandle, token: &str) -> ApiResult<Identity> {
        let claims = self.decode(token).ok_or(ApiError::Unauthenticated)?;

        let sid = claims.sid.clone();
        let row = db
            .call(move |db| Ok(db.get_session(&sid)?))
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        if row.user_id != claims.sub {
            debug!("Session {} does not belong to {}", row.id, claims.sub);
            return Err(ApiError::Unauthenticated);
        }

        Ok(Identity {
            user_id: row.user_id,
            role: row.role,
        })
    }

    /// Drops the server-side session if `token` names one. Succeeds either way.
    pub async fn invalidate(&self, db: &DbHandle, token: Option<&str>) -> ApiResult<()> {
        let Some(claims) = token.and_then(|t| self.decode(t)) else {
            return Ok(());
        };

        let sid = claims.sid;
        let removed = db.call(move |db| Ok(db.delete_session(&sid)?)).await?;
        if removed {
            info!("Session closed for user {}", claims.sub);
        }
        Ok(())
    }

    pub async fn purge_expired(&self, db: &DbHandle) -> ApiResult<usize> {
        db.call(|db| Ok(db.purge_expired_sessions()?)).await
    }

    /// The cookie handed out on login. `SameSite=None` lets a frontend served
    /// from another origin send it, which browsers only allow with `Secure`.
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.ttl.num_seconds());
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .max_age(max_age)
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .build()
    }

    /// Template for the logout cookie; `CookieJar::remove` blanks the value
    /// and sets `Max-Age=0` with an expiry in the past.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .build()
    }

    fn decode(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}
