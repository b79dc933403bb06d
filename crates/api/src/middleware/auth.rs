//! Bearer token extractors.
//!
//! Handlers take [`RequireAuth`] or [`RequireAdmin`] as an argument; the
//! extractor verifies the `Authorization: Bearer` header before the handler
//! runs and answers with the fixed 401 bodies the dashboard recognizes.
//!
//! ```rust,ignore
//! async fn me(RequireAuth(claims): RequireAuth) -> Json<UserProfile> {
//!     Json(claims.profile())
//! }
//! ```

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use tillpoint_core::{ApiErrorBody, ApiErrorCode, Role};

use crate::auth::{Claims, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
pub struct RequireAuth(pub Claims);

/// Extractor that requires a valid bearer token for an admin.
pub struct RequireAdmin(pub Claims);

/// Why a request was refused before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No bearer token on the request.
    Missing,
    /// Token present but unusable.
    Invalid,
    /// Token past its expiry.
    Expired,
    /// Valid token, insufficient role.
    Forbidden,
}

impl AuthRejection {
    fn body(self) -> ApiErrorBody {
        match self {
            Self::Missing => ApiErrorBody::token_missing(),
            Self::Invalid => ApiErrorBody::token_invalid(),
            Self::Expired => ApiErrorBody::token_expired(),
            Self::Forbidden => ApiErrorBody::new(ApiErrorCode::Forbidden, "Admin access required"),
        }
    }

    const fn status(self) -> StatusCode {
        match self {
            Self::Missing | Self::Invalid | Self::Expired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl From<TokenError> for AuthRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Expired,
            TokenError::Invalid => Self::Invalid,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// The token from an `Authorization: Bearer <token>` header.
///
/// An empty token counts as missing.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::Missing)?;
        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, path = %parts.uri.path(), "Rejected bearer token");
            AuthRejection::from(e)
        })?;
        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            tracing::info!(user_id = claims.sub, role = %claims.role, "Admin route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(claims))
    }
}
