//! Login and profile handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use tillpoint_core::{AuthResponse, LoginRequest, UserProfile};

use crate::auth::verify_password;
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `POST /api/auth/login`
///
/// Unknown usernames and wrong passwords get the same answer.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(request) = payload?;
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_owned(),
        ));
    }

    let record = UserRepository::new(state.pool())
        .find_by_username(username)
        .await?;

    let Some(record) = record else {
        tracing::info!(username, "Login failed: unknown user");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&request.password, &record.password_hash)? {
        tracing::info!(user_id = %record.profile.id, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens().issue(&record.profile)?;
    tracing::info!(user_id = %record.profile.id, role = %record.profile.role, "Login succeeded");

    Ok(Json(AuthResponse {
        token,
        user: record.profile,
    }))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(claims): RequireAuth) -> Json<UserProfile> {
    Json(claims.profile())
}
