//! Dashboard account management.
//!
//! # Usage
//!
//! ```bash
//! # Password from the environment
//! TILLPOINT_USER_PASSWORD='…' tillpoint user create -u owner -n "Store Owner" -r admin
//!
//! # Password from stdin
//! printf '%s\n' "$PASSWORD" | tillpoint user create -u till1 -n "Front Till" -r cashier
//! ```
//!
//! # Environment Variables
//!
//! - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` - MySQL connection
//! - `TILLPOINT_USER_PASSWORD` - Password for the new account (optional)

use std::io::BufRead;

use thiserror::Error;

use tillpoint_api::auth::{AuthError, hash_password};
use tillpoint_api::db::{self, RepositoryError, UserRepository};
use tillpoint_api::{ConfigError, DatabaseConfig};
use tillpoint_core::{Role, UserId};

const PASSWORD_ENV: &str = "TILLPOINT_USER_PASSWORD";
const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Invalid role: {0}. Valid roles: admin, cashier")]
    InvalidRole(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("Username and display name must not be empty")]
    EmptyField,

    #[error("failed to read password: {0}")]
    Io(#[from] std::io::Error),
}

fn read_password() -> Result<String, UserError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    tracing::info!("{PASSWORD_ENV} not set, reading password from stdin");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn validate_password(password: &str) -> Result<(), UserError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserError::WeakPassword);
    }
    Ok(())
}

/// Create a dashboard account.
///
/// # Errors
///
/// Returns an error if the role is unknown, the password is too short, the
/// username is taken, or the database is unreachable.
pub async fn create_user(
    username: &str,
    display_name: &str,
    role: &str,
) -> Result<UserId, UserError> {
    let username = username.trim();
    let display_name = display_name.trim();
    if username.is_empty() || display_name.is_empty() {
        return Err(UserError::EmptyField);
    }
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let password = read_password()?;
    validate_password(&password)?;
    let password_hash = hash_password(&password)?;

    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, database = %config.name, "Connecting to database...");
    let pool = db::create_pool(&config).await?;

    let result = insert_user(&pool, username, &password_hash, display_name, role).await;
    pool.close().await;
    result
}

async fn insert_user(
    pool: &sqlx::MySqlPool,
    username: &str,
    password_hash: &str,
    display_name: &str,
    role: Role,
) -> Result<UserId, UserError> {
    let users = UserRepository::new(pool);
    if users.find_by_username(username).await?.is_some() {
        return Err(UserError::UserExists(username.to_owned()));
    }

    let id = users
        .create(username, password_hash, display_name, role)
        .await?;
    tracing::info!(user_id = %id, username, role = %role, "User created");
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(matches!(validate_password("short"), Err(UserError::WeakPassword)));
        assert!(validate_password("long enough").is_ok());
        // Counted in characters, not bytes.
        assert!(validate_password("ééééééé").is_err());
    }

    #[tokio::test]
    async fn test_rejects_unknown_role_before_touching_database() {
        let err = create_user("sam", "Sam", "manager").await.unwrap_err();
        assert!(matches!(err, UserError::InvalidRole(role) if role == "manager"));
    }

    #[tokio::test]
    async fn test_rejects_blank_username() {
        let err = create_user("  ", "Sam", "admin").await.unwrap_err();
        assert!(matches!(err, UserError::EmptyField));
    }
}
