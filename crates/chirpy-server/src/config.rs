use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::warn;

use chirpy_api::auth::ApiConfig;
use chirpy_api::tokens::{DEFAULT_ACCESS_ISSUER, DEFAULT_REFRESH_ISSUER, TokenConfig};

const DEV_SECRET: &str = "dev-secret-change-me";

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub tokens: TokenConfig,
    pub api: ApiConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup so tests need not touch the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_SECRET.to_string()
            }
        };

        let polka_api_key = lookup("POLKA_API_KEY").filter(|k| !k.is_empty());
        if polka_api_key.is_none() {
            warn!("POLKA_API_KEY not set, payment webhooks will be rejected");
        }

        let ttl_secs: i64 = var("CHIRPY_ACCESS_TOKEN_TTL_SECS", "3600")
            .parse()
            .context("CHIRPY_ACCESS_TOKEN_TTL_SECS must be an integer")?;
        if ttl_secs <= 0 {
            anyhow::bail!("CHIRPY_ACCESS_TOKEN_TTL_SECS must be positive");
        }
        let access_token_ttl = Duration::try_seconds(ttl_secs)
            .context("CHIRPY_ACCESS_TOKEN_TTL_SECS is out of range")?;

        let host = var("CHIRPY_HOST", "0.0.0.0");
        let port: u16 = var("CHIRPY_PORT", "8080")
            .parse()
            .context("CHIRPY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("CHIRPY_HOST must be an IP address")?;

        Ok(Self {
            addr,
            db_path: PathBuf::from(var("CHIRPY_DB_PATH", "database.json")),
            tokens: TokenConfig {
                secret,
                access_issuer: var("ACCESS_TOKEN_ISSUER", DEFAULT_ACCESS_ISSUER),
                refresh_issuer: var("REFRESH_TOKEN_ISSUER", DEFAULT_REFRESH_ISSUER),
            },
            api: ApiConfig {
                access_token_ttl,
                polka_api_key,
                static_dir: PathBuf::from(var("CHIRPY_STATIC_DIR", ".")),
            },
        })
    }
}
