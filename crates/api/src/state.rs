//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::MySqlPool;

use crate::auth::TokenIssuer;
use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: MySqlPool,
    tokens: TokenIssuer,
}

impl AppState {
    /// Create application state, deriving the token issuer from `config`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: MySqlPool) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }
}
