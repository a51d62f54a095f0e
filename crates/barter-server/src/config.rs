use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

const DEFAULT_SECRET: &str = "dev-secret-change-me";

/// Server configuration loaded from environment variables.
///
/// | Env Var                 | Default                |
/// |-------------------------|------------------------|
/// | `BARTER_HOST`           | `0.0.0.0`              |
/// | `BARTER_PORT`           | `8000`                 |
/// | `BARTER_DB_PATH`        | `barter.db`            |
/// | `BARTER_SECRET`         | `dev-secret-change-me` |
/// | `BARTER_SECURE_COOKIES` | `false`                |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Signs session cookies.
    pub secret: String,
    pub secure_cookies: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("BARTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("BARTER_PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .context("BARTER_PORT must be a valid port number")?;
        let db_path: PathBuf = std::env::var("BARTER_DB_PATH")
            .unwrap_or_else(|_| "barter.db".into())
            .into();

        let secret = std::env::var("BARTER_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECRET.into());
        if secret == DEFAULT_SECRET {
            warn!("BARTER_SECRET is unset; sessions are signed with the development placeholder");
        }

        let secure_cookies = std::env::var("BARTER_SECURE_COOKIES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            db_path,
            secret,
            secure_cookies,
        })
    }
}
