use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use mytravel_db::Database;

use crate::error::ApiError;
use crate::session::SessionManager;
use crate::storage::PhotoStore;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs, built once at startup.
pub struct AppStateInner {
    pub db: DbHandle,
    pub photos: PhotoStore,
    pub sessions: SessionManager,
}

/// Shared database handle that runs every call on the blocking pool under a
/// deadline.
#[derive(Clone)]
pub struct DbHandle {
    db: Arc<Database>,
    timeout: Duration,
}

impl DbHandle {
    pub fn new(db: Arc<Database>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Runs `f` off the async runtime. A call that outlives the deadline is
    /// reported as an internal error; the blocking task itself still runs to
    /// completion, there is no way to cancel a SQLite statement midway.
    pub async fn call<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let task = tokio::task::spawn_blocking(move || f(&db));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("spawn_blocking join error: {}", e);
                Err(ApiError::Internal(anyhow::anyhow!("storage task failed: {}", e)))
            }
            Err(_) => Err(ApiError::Internal(anyhow::anyhow!(
                "storage call exceeded {:?}",
                self.timeout
            ))),
        }
    }
}
