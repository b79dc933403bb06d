//! Unified error handling.
//!
//! Every handler returns [`Result<T>`]; failures become a JSON
//! [`ApiErrorBody`] with the matching status code.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tillpoint_core::{ApiErrorBody, ApiErrorCode};

use crate::auth::AuthError;
use crate::db::RepositoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Token or password machinery failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Username or password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but the role does not allow this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn code(&self) -> ApiErrorCode {
        match self {
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => ApiErrorCode::Internal,
            Self::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            Self::Forbidden(_) => ApiErrorCode::Forbidden,
            Self::NotFound(_) => ApiErrorCode::NotFound,
            Self::BadRequest(_) => ApiErrorCode::BadRequest,
        }
    }

    /// Body sent to the client. Internal details stay in the logs.
    fn body(&self) -> ApiErrorBody {
        let message = match self {
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
            Self::InvalidCredentials => "Invalid username or password".to_owned(),
            Self::Forbidden(msg) | Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
        };
        ApiErrorBody::new(self.code(), message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request error");
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
