//! Tillpoint dashboard client.
//!
//! The session/navigation core a dashboard shell builds on:
//!
//! - [`storage`] - durable key/value storage holding the token and profile
//! - [`session`] - [`SessionContext`], the single owner of the session, with
//!   event subscription for login/logout/expiry
//! - [`gateway`] - [`ApiClient`], which authenticates every request and ends
//!   the session when the server refuses its token
//! - [`guard`] - business-type gate and role-based route guard
//!
//! # Example
//!
//! ```rust,ignore
//! let (client, mut navigator) = tillpoint_client::bootstrap(&ClientConfig::from_env()?).await?;
//! let mut events = client.session().subscribe();
//!
//! match navigator.decide(&client.session().state().await, "/admin/stock") {
//!     GuardDecision::Render => show_stock_page(),
//!     GuardDecision::RedirectToLogin { from } => show_login(from),
//!     GuardDecision::Redirect { to } => navigate(&to),
//!     GuardDecision::Loading => show_spinner(),
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod session;
pub mod storage;

pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use gateway::{ApiClient, RequestBody};
pub use guard::{BusinessGate, GuardDecision, Navigator, RouteTable, authorize};
pub use session::{SessionContext, SessionEvent, SessionState};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

/// Restore the stored session, build the API client and resolve the
/// business gate.
///
/// A failed business-type fetch is logged and leaves the navigator in its
/// loading state so the shell can retry with
/// [`Navigator::refresh_business`].
///
/// # Errors
///
/// Returns `ApiError::Storage` if the stored session cannot be read, or
/// `ApiError::Http` if the HTTP client cannot be built.
pub async fn bootstrap(config: &ClientConfig) -> Result<(ApiClient, Navigator), ApiError> {
    let session = SessionContext::new(config.storage());
    session.restore().await?;

    let client = ApiClient::new(config, session)?;
    let mut navigator = Navigator::new();
    if let Err(e) = navigator.refresh_business(&client).await {
        tracing::warn!(error = %e, "Could not load business configuration");
    }

    Ok((client, navigator))
}
