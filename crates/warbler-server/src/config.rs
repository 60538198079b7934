use std::path::PathBuf;

use tracing::warn;
use warbler_api::session::SessionConfig;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `WARBLER_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("WARBLER_SESSION_SECRET").unwrap_or_else(|_| {
            warn!("WARBLER_SESSION_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });

        Ok(Self {
            db_path: std::env::var("WARBLER_DB_PATH")
                .unwrap_or_else(|_| "warbler.db".into())
                .into(),
            host: std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("WARBLER_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            session: SessionConfig {
                secret,
                ttl_hours: session_ttl_hours(),
                secure_cookies: secure_cookies(),
            },
        })
    }
}

fn session_ttl_hours() -> i64 {
    std::env::var("WARBLER_SESSION_TTL_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|&h| h > 0)
        .unwrap_or(24)
}

fn secure_cookies() -> bool {
    std::env::var("WARBLER_SECURE_COOKIES")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
