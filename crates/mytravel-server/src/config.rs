use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

/// Session keys that must be replaced before a real deployment.
const PLACEHOLDER_KEYS: &[&str] = &["dev-session-key-change-me", "change-me"];

const DEFAULT_SESSION_KEY: &str = "dev-session-key-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub photo_dir: PathBuf,
    pub session_key: String,
    pub storage_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("MYTRAVEL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .context("PORT must be a port number")?;

        let data_dir: PathBuf = std::env::var("MYTRAVEL_DATA_DIR")
            .unwrap_or_else(|_| "./data".into())
            .into();
        let db_name = std::env::var("MYTRAVEL_DB_NAME").unwrap_or_else(|_| "mytravel".into());
        let db_path = data_dir.join(format!("{}.db", db_name));
        let photo_dir: PathBuf = std::env::var("MYTRAVEL_PHOTO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("photos"));

        let session_key = std::env::var("MYTRAVEL_SESSION_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_KEY.into());
        if PLACEHOLDER_KEYS.contains(&session_key.as_str()) {
            warn!("MYTRAVEL_SESSION_KEY is unset or still a placeholder; set it in .env before deploying");
        }

        let storage_timeout_secs: u64 = std::env::var("MYTRAVEL_STORAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            host,
            port,
            db_path,
            photo_dir,
            session_key,
            storage_timeout: Duration::from_secs(storage_timeout_secs),
        })
    }
}
