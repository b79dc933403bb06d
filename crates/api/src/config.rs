//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DB_USER` - `MySQL` user
//! - `DB_PASSWORD` - `MySQL` password
//! - `DB_NAME` - `MySQL` database name
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DB_HOST` - `MySQL` host (default: 127.0.0.1)
//! - `DB_PORT` - `MySQL` port (default: 3306)
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 5000)
//! - `JWT_TTL_SECS` - Token lifetime (default: 28800, eight hours)
//! - `CORS_ORIGIN` - Dashboard origin allowed to call the API (default: none)
//! - `RATE_LIMIT_WINDOW_SECS` - Login rate-limit window (default: 60)
//! - `RATE_LIMIT_MAX` - Login attempts per window per client (default: 10)

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `MySQL` connection settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Token lifetime
    pub jwt_ttl: Duration,
    /// Origin allowed by CORS; `None` disables cross-origin access
    pub cors_origin: Option<String>,
    /// Login rate limiting
    pub rate_limit: RateLimitConfig,
}

/// `MySQL` connection settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

/// Login rate limit: at most `max_requests` per `window` per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database = DatabaseConfig::from_lookup(lookup)?;
        let host = env.parsed_or("API_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = env.parsed_or("API_PORT", 5000_u16)?;

        let jwt_secret = SecretString::from(env.required("JWT_SECRET")?);
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;
        let jwt_ttl = Duration::from_secs(env.parsed_or("JWT_TTL_SECS", 8 * 60 * 60_u64)?);

        let cors_origin = env.optional("CORS_ORIGIN");

        let defaults = RateLimitConfig::default();
        let window = env.parsed_or("RATE_LIMIT_WINDOW_SECS", defaults.window.as_secs())?;
        let max_requests = env.parsed_or("RATE_LIMIT_MAX", defaults.max_requests)?;
        if window == 0 || max_requests == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RATE_LIMIT_*".to_string(),
                "window and maximum must both be positive".to_string(),
            ));
        }

        Ok(Self {
            database,
            host,
            port,
            jwt_secret,
            jwt_ttl,
            cors_origin,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(window),
                max_requests,
            },
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load the `DB_*` variables from the environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load the `DB_*` variables through an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);
        Ok(Self {
            host: env.or_default("DB_HOST", "127.0.0.1"),
            port: env.parsed_or("DB_PORT", 3306_u16)?,
            user: env.required("DB_USER")?,
            password: SecretString::from(env.required("DB_PASSWORD")?),
            name: env.required("DB_NAME")?,
        })
    }

    /// Whether a password is set (an empty one is legal for local `MySQL`).
    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.trim().parse().map_err(invalid(key)),
            None => Ok(default),
        }
    }
}

fn invalid<E: std::fmt::Display>(key: &str) -> impl FnOnce(E) -> ConfigError + '_ {
    move |e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
}

/// Validate that the signing secret is long, not a placeholder, and random-looking.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    validate_secret_strength(value, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DB_USER", "pos"),
            ("DB_PASSWORD", "pos-pass"),
            ("DB_NAME", "pos"),
            ("JWT_SECRET", GOOD_SECRET),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = ApiConfig::from_lookup(&vars(&minimal())).unwrap();
        assert_eq!(config.database.host, "127.0.0.1");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt_ttl, Duration::from_secs(28_800));
        assert_eq!(config.cors_origin, None);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = minimal();
        pairs.extend([
            ("DB_PORT", "3307"),
            ("CORS_ORIGIN", "http://localhost:3000"),
            ("RATE_LIMIT_WINDOW_SECS", "900"),
            ("RATE_LIMIT_MAX", "100"),
        ]);
        let config = ApiConfig::from_lookup(&vars(&pairs)).unwrap();
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
        assert_eq!(config.rate_limit.max_requests, 100);
    }

    #[test]
    fn test_missing_required() {
        let err = ApiConfig::from_lookup(&vars(&[("DB_USER", "pos")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = minimal();
        pairs.push(("DB_PORT", "mysql"));
        let err = ApiConfig::from_lookup(&vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "DB_PORT"));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut pairs = minimal();
        pairs.push(("RATE_LIMIT_MAX", "0"));
        assert!(ApiConfig::from_lookup(&vars(&pairs)).is_err());
    }

    #[test]
    fn test_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_jwt_secret(&secret, "JWT_SECRET").is_err());
    }

    #[test]
    fn test_jwt_secret_placeholder() {
        let secret = SecretString::from("changeme-changeme-changeme-changeme");
        let err = validate_jwt_secret(&secret, "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_jwt_secret_low_entropy() {
        let secret = SecretString::from("a".repeat(40));
        assert!(validate_jwt_secret(&secret, "JWT_SECRET").is_err());
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_database_debug_redacts_password() {
        let db = DatabaseConfig::from_lookup(&vars(&minimal())).unwrap();
        assert!(!format!("{db:?}").contains("pos-pass"));
        assert!(db.has_password());
    }
}
