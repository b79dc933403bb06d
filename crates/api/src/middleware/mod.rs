//! Request extractors and layers.

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthRejection, RequireAdmin, RequireAuth};
pub use rate_limit::{RateLimitError, RateLimiterLayer, login_rate_limiter};
