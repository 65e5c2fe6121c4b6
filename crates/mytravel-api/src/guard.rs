//! Ownership-or-admin authorization. Every mutating route resolves the
//! session (via [`crate::middleware::CurrentUser`]), loads the stored record,
//! and passes its owner through [`require_owner_or_admin`] before writing.

use tracing::warn;

use mytravel_types::models::Identity;

use crate::error::ApiError;

pub fn require_owner_or_admin(identity: &Identity, owner_id: &str) -> Result<(), ApiError> {
    if identity.is_admin() || identity.user_id == owner_id {
        return Ok(());
    }
    warn!(
        "User {} denied access to a resource owned by {}",
        identity.user_id, owner_id
    );
    Err(ApiError::Forbidden)
}

pub fn require_admin(identity: &Identity) -> Result<(), ApiError> {
    if identity.is_admin() {
        Ok(())
    } else {
        warn!("User {} denied access to an admin route", identity.user_id);
        Err(ApiError::Forbidden)
    }
}
