mod cleanup;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use mytravel_api::session::SessionManager;
use mytravel_api::state::{AppState, AppStateInner, DbHandle};
use mytravel_api::storage::PhotoStore;
use mytravel_db::Database;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mytravel=debug,mytravel_api=debug,mytravel_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    if let Some(parent) = config.db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db = Arc::new(Database::open(&config.db_path)?);
    let db = DbHandle::new(db, config.storage_timeout);

    let photos = PhotoStore::new(config.photo_dir.clone(), db.clone()).await?;
    let sessions = SessionManager::new(&config.session_key);

    let state: AppState = Arc::new(AppStateInner {
        db,
        photos,
        sessions,
    });

    // Background session purge (runs every hour)
    tokio::spawn(cleanup::run_session_purge_loop(state.clone(), 3600));

    let app = mytravel_api::router::build(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("MyTravel server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
