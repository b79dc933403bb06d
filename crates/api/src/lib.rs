//! Tillpoint API library.
//!
//! Authentication and business settings for the POS dashboard, exposed as a
//! library so the router can be exercised in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError, DatabaseConfig, RateLimitConfig};
pub use error::AppError;
pub use state::AppState;
