//! Bearer tokens and password hashing.
//!
//! Tokens are HS256 JWTs carrying the user's profile, so verifying a request
//! never touches the database. Passwords are stored as Argon2 PHC strings.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenIssuer};

use thiserror::Error;

/// Errors that can occur while issuing credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Password hashing failed or a stored hash is malformed.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}
