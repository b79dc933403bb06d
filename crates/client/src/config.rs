//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TILLPOINT_API_URL` - Base URL of the Tillpoint API (e.g. `http://127.0.0.1:5000`)
//!
//! ## Optional
//! - `TILLPOINT_SESSION_FILE` - File that keeps the session across restarts
//!   (default: in-memory only)
//! - `TILLPOINT_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::storage::{FileStorage, MemoryStorage, SessionStorage};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Dashboard client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API service
    pub api_url: Url,
    /// Where the session is persisted; `None` keeps it in memory
    pub session_file: Option<PathBuf>,
    /// Per-request timeout
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with defaults for everything else.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            session_file: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("TILLPOINT_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("TILLPOINT_API_URL".to_string()))?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("TILLPOINT_API_URL".to_string(), e.to_string())
        })?;

        let session_file = lookup("TILLPOINT_SESSION_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let http_timeout = match lookup("TILLPOINT_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("TILLPOINT_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            session_file,
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    /// Build the session storage this configuration asks for.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        match &self.session_file {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        }
    }
}
