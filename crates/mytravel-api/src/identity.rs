//! Account registration and credential checks.
//!
//! Functions here are synchronous: they hit SQLite and run Argon2, so callers
//! invoke them through [`crate::state::DbHandle::call`].

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::{info, warn};

use mytravel_db::{Database, is_unique_violation};
use mytravel_types::api::UserView;
use mytravel_types::models::{Identity, Role};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email & password required")]
    InvalidInput,

    #[error("email already used")]
    Conflict,

    #[error("email not found")]
    NotFound,

    #[error("wrong password")]
    InvalidCredential,

    #[error("internal server error")]
    Storage(#[from] anyhow::Error),
}

/// What a successful login yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub identity: Identity,
    pub name: String,
}

pub fn register(db: &Database, name: &str, email: &str, password: &str) -> Result<Identity, AuthError> {
    let email = email.trim();
    if email.is_empty() || password.trim().is_empty() {
        return Err(AuthError::InvalidInput);
    }

    if db.get_user_by_email(email)?.is_some() {
        return Err(AuthError::Conflict);
    }

    let password_hash = hash_password(password)?;

    // The pre-check above races with concurrent registrations; the UNIQUE
    // index settles it.
    let user = db
        .create_user(name.trim(), email, &password_hash)
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Conflict
            } else {
                AuthError::Storage(e)
            }
        })?;

    info!("Registered user {} ({})", user.id, user.email);
    Ok(Identity {
        user_id: user.id,
        role: user.role,
    })
}

pub fn authenticate(db: &Database, email: &str, password: &str) -> Result<Authenticated, AuthError> {
    let user = db
        .get_user_by_email(email.trim())?
        .ok_or(AuthError::NotFound)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {}", user.id, e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for user {}", user.id);
            AuthError::InvalidCredential
        })?;

    Ok(Authenticated {
        identity: Identity {
            user_id: user.id,
            role: user.role,
        },
        name: user.name,
    })
}

/// Every account, without password hashes.
pub fn list_users(db: &Database) -> anyhow::Result<Vec<UserView>> {
    Ok(db.list_users()?.into_iter().map(UserView::from).collect())
}

/// Grants the admin role. There is no HTTP route for this; operators use it
/// when provisioning.
pub fn promote_to_admin(db: &Database, user_id: &str) -> anyhow::Result<bool> {
    db.set_user_role(user_id, Role::Admin)
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}
