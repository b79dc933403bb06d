//! MySQL access for the API.
//!
//! ## Tables
//!
//! - `users` - Dashboard accounts (username, Argon2 hash, display name, role)
//! - `settings` - Key/value store; currently only `business_type`
//!
//! # Migrations
//!
//! Migration scripts live in `crates/api/migrations/` and are applied with:
//! ```bash
//! cargo run -p tillpoint-cli -- migrate run
//! ```

pub mod settings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use thiserror::Error;

pub use settings::SettingsRepository;
pub use users::{UserRecord, UserRepository};

use crate::config::DatabaseConfig;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Connection options for `config`, without opening anything.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name);

    if config.has_password() {
        options.password(config.password.expose_secret())
    } else {
        options
    }
}

fn pool_options() -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the initial connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    pool_options().connect_with(connect_options(config)).await
}

/// Build a pool that connects on first use.
///
/// Useful when the server should start even if the database is still
/// coming up.
#[must_use]
pub fn create_lazy_pool(config: &DatabaseConfig) -> MySqlPool {
    pool_options().connect_lazy_with(connect_options(config))
}
