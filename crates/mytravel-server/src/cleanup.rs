use std::time::Duration;

use tracing::{info, warn};

use mytravel_api::state::AppState;

/// Background task that drops expired session rows. Expired sessions already
/// fail to resolve; this only keeps the table from growing.
pub async fn run_session_purge_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match state.sessions.purge_expired(&state.db).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: purged {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {:?}", e);
            }
        }
    }
}
