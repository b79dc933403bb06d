//! JSON error body exchanged between the API service and its clients.
//!
//! Every non-success response carries a human-readable `message` and, for
//! failures a client must react to, a stable `code`. Clients branch on the
//! code; the message is for display. Older servers send only the message,
//! so the three authentication messages in [`legacy_messages`] are still
//! recognised when no code is present.

use serde::{Deserialize, Serialize};

/// Authentication messages the server has always sent with a 401.
pub mod legacy_messages {
    /// The bearer token's expiry has passed.
    pub const TOKEN_EXPIRED: &str = "Token expired";
    /// No bearer token was sent.
    pub const ACCESS_TOKEN_REQUIRED: &str = "Access token required";
    /// The bearer token could not be verified.
    pub const INVALID_TOKEN: &str = "Invalid token";
}

/// Stable machine-readable error identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    TokenExpired,
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    Forbidden,
    NotFound,
    BadRequest,
    RateLimited,
    Internal,
    /// A code this build does not know about.
    #[serde(other)]
    Unknown,
}

/// How a 401 must be handled by a client holding a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Token was valid once but has expired.
    Expired,
    /// Token is missing, malformed or forged.
    Rejected,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable description.
    pub message: String,
    /// Stable identifier, absent on responses from older servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ApiErrorCode>,
}

impl ApiErrorBody {
    /// Create a body with a message and code.
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Body for an expired bearer token.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::new(ApiErrorCode::TokenExpired, legacy_messages::TOKEN_EXPIRED)
    }

    /// Body for a request without a bearer token.
    #[must_use]
    pub fn token_missing() -> Self {
        Self::new(
            ApiErrorCode::TokenMissing,
            legacy_messages::ACCESS_TOKEN_REQUIRED,
        )
    }

    /// Body for a bearer token that failed verification.
    #[must_use]
    pub fn token_invalid() -> Self {
        Self::new(ApiErrorCode::TokenInvalid, legacy_messages::INVALID_TOKEN)
    }

    /// Classify this body as a session-ending authentication failure.
    ///
    /// The structured code wins when present; otherwise the legacy message
    /// text is matched exactly. Anything else (bad login credentials, for
    /// instance) is not a session failure.
    #[must_use]
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self.code {
            Some(ApiErrorCode::TokenExpired) => Some(AuthFailure::Expired),
            Some(ApiErrorCode::TokenMissing | ApiErrorCode::TokenInvalid) => {
                Some(AuthFailure::Rejected)
            }
            Some(_) => None,
            None => match self.message.as_str() {
                legacy_messages::TOKEN_EXPIRED => Some(AuthFailure::Expired),
                legacy_messages::ACCESS_TOKEN_REQUIRED | legacy_messages::INVALID_TOKEN => {
                    Some(AuthFailure::Rejected)
                }
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ApiErrorBody {
        serde_json::from_str(json).expect("valid error body")
    }

    #[test]
    fn test_legacy_messages_classify_without_code() {
        assert_eq!(
            parse(r#"{"message":"Token expired"}"#).auth_failure(),
            Some(AuthFailure::Expired)
        );
        assert_eq!(
            parse(r#"{"message":"Invalid token"}"#).auth_failure(),
            Some(AuthFailure::Rejected)
        );
        assert_eq!(
            parse(r#"{"message":"Access token required"}"#).auth_failure(),
            Some(AuthFailure::Rejected)
        );
        assert_eq!(parse(r#"{"message":"Nope"}"#).auth_failure(), None);
    }

    #[test]
    fn test_code_takes_precedence_over_message() {
        let body = parse(r#"{"message":"Token expired","code":"invalid_credentials"}"#);
        assert_eq!(body.auth_failure(), None);

        let body = parse(r#"{"message":"Your session ended","code":"token_expired"}"#);
        assert_eq!(body.auth_failure(), Some(AuthFailure::Expired));
    }

    #[test]
    fn test_unknown_code_is_tolerated() {
        let body = parse(r#"{"message":"later","code":"quota_exceeded"}"#);
        assert_eq!(body.code, Some(ApiErrorCode::Unknown));
        assert_eq!(body.auth_failure(), None);
    }

    #[test]
    fn test_constructors_use_legacy_text() {
        assert_eq!(ApiErrorBody::token_expired().message, "Token expired");
        assert_eq!(ApiErrorBody::token_missing().message, "Access token required");
        assert_eq!(ApiErrorBody::token_invalid().message, "Invalid token");
        let json = serde_json::to_value(ApiErrorBody::token_invalid()).expect("serialize");
        assert_eq!(json["code"], "token_invalid");
    }
}
