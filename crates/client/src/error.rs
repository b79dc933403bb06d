//! Errors surfaced by the dashboard client.

use thiserror::Error;

use tillpoint_core::ApiErrorCode;

use crate::storage::StorageError;

/// Errors that can occur when talking to the Tillpoint API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server reported the bearer token as expired. The local session
    /// has been cleared.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// The server reported the bearer token as missing or invalid. The local
    /// session has been cleared.
    #[error("Authentication failed. Please login again.")]
    AuthenticationFailed,

    /// Any other non-success response.
    #[error("{message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or a generic fallback.
        message: String,
        /// Server-supplied error code, if any.
        code: Option<ApiErrorCode>,
    },

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Session storage could not be read or written.
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Whether this error ended the local session.
    #[must_use]
    pub const fn ended_session(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthenticationFailed)
    }

    /// HTTP status of a failed response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired | Self::AuthenticationFailed => Some(401),
            Self::RequestFailed { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::InvalidUrl(_) | Self::Storage(_) => None,
        }
    }
}
