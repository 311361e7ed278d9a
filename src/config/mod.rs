//! Configuration module for the reviewer service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration values that could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Deadline for a single store operation, including lock waits
    pub operation_timeout: Duration,
    /// Fixed seed for reviewer selection; entropy-seeded when absent
    pub picker_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("PR_REVIEWER_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let bind_addr = parse_var("PR_REVIEWER_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("PR_REVIEWER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timeout_secs: u64 = parse_var("PR_REVIEWER_OPERATION_TIMEOUT_SECS", "10")?;

        let picker_seed = match env::var("PR_REVIEWER_PICKER_SEED") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PR_REVIEWER_PICKER_SEED",
                value: raw,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            operation_timeout: Duration::from_secs(timeout_secs),
            picker_seed,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}
