//! Configuration module for the hub client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Base URLs of the three remote API namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Login, registration and user moderation
    pub auth: String,
    /// Faction listing and updates
    pub factions: String,
    /// Posts and site statistics
    pub forum: String,
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: ApiEndpoints,
    /// Path to the SQLite file backing local storage
    pub storage_path: PathBuf,
    /// Upper bound on any single API request
    pub request_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let endpoints = ApiEndpoints {
            auth: env::var("RTOWN_API_AUTH_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/auth".to_string()),
            factions: env::var("RTOWN_API_FACTIONS_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/factions".to_string()),
            forum: env::var("RTOWN_API_FORUM_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/forum".to_string()),
        };

        let storage_path = env::var("RTOWN_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/local.sqlite".to_string())
            .into();

        let timeout_secs = match env::var("RTOWN_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid RTOWN_REQUEST_TIMEOUT_SECS {:?}, using {}s",
                    raw,
                    DEFAULT_TIMEOUT_SECS
                );
                DEFAULT_TIMEOUT_SECS
            }),
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let log_level = env::var("RTOWN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            endpoints,
            storage_path,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
        }
    }
}
