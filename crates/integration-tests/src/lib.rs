//! Integration tests for Tillpoint.
//!
//! # Running Tests
//!
//! ```bash
//! # Contract tests (no database needed)
//! cargo test -p tillpoint-integration-tests
//!
//! # Database-backed tests against a migrated MySQL
//! cargo run -p tillpoint-cli -- migrate run
//! cargo test -p tillpoint-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `session_contract` - the 401 contract between the API and the client
//! - `database` - login and settings against a real database (ignored by default)
//!
//! [`TestApi`] serves the real router on an ephemeral port. Its pool connects
//! lazily, so routes that never touch the database work without one.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use tillpoint_api::auth::TokenIssuer;
use tillpoint_api::{ApiConfig, AppState, ConfigError, db, middleware, routes};
use tillpoint_client::{ApiClient, MemoryStorage, SessionContext};
use tillpoint_core::{Role, UserId, UserProfile};

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "Tq7#vL2$pX9!rM4&kZ8^wN1*hB6@cF3%";

/// A running API server.
pub struct TestApi {
    pub base_url: Url,
    pub tokens: TokenIssuer,
    handle: JoinHandle<()>,
}

/// Build settings for a test server.
///
/// `DB_*` variables from the environment are honoured so the ignored tests
/// can reach a real database; everything else comes from `overrides` or
/// defaults.
///
/// # Errors
///
/// Returns `ConfigError` if an override is invalid.
pub fn test_config(overrides: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("DB_HOST".to_owned(), "127.0.0.1".to_owned()),
        ("DB_USER".to_owned(), "tillpoint".to_owned()),
        ("DB_PASSWORD".to_owned(), String::new()),
        ("DB_NAME".to_owned(), "tillpoint_test".to_owned()),
        ("JWT_SECRET".to_owned(), TEST_JWT_SECRET.to_owned()),
    ]);
    for key in ["DB_HOST", "DB_PORT", "DB_USER", "DB_PASSWORD", "DB_NAME"] {
        if let Ok(value) = std::env::var(key) {
            vars.insert(key.to_owned(), value);
        }
    }
    for (key, value) in overrides {
        vars.insert((*key).to_owned(), (*value).to_owned());
    }

    ApiConfig::from_lookup(&|key: &str| vars.get(key).cloned())
}

impl TestApi {
    /// Serve the router without rate limiting.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot start.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[], false).await
    }

    /// Serve the router with config `overrides`, optionally rate limiting
    /// the login route.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid or the server cannot start.
    pub async fn spawn_with(overrides: &[(&str, &str)], rate_limit: bool) -> Self {
        let config = test_config(overrides).expect("valid test config");
        let pool = db::create_lazy_pool(&config.database);
        let limiter = rate_limit
            .then(|| middleware::login_rate_limiter(&config.rate_limit))
            .transpose()
            .expect("valid rate limit");

        let state = AppState::new(config, pool);
        let tokens = state.tokens().clone();
        let app = routes::router(state, limiter);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("server url"),
            tokens,
            handle,
        }
    }

    /// A client with an empty in-memory session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub async fn client(&self) -> ApiClient {
        let session = SessionContext::new(Arc::new(MemoryStorage::new()));
        session.restore().await.expect("restore empty session");
        ApiClient::with_http(self.base_url.clone(), reqwest::Client::new(), session)
    }

    /// Absolute URL for `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid URL path.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("valid path")
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A profile for tests.
#[must_use]
pub fn profile(id: i32, username: &str, role: Role) -> UserProfile {
    UserProfile {
        id: UserId::new(id),
        username: username.to_owned(),
        display_name: username.to_uppercase(),
        role,
    }
}
