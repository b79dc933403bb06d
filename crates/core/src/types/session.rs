//! Session records shared by the dashboard client and the API service.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::role::Role;

/// Profile of the logged-in staff member.
///
/// Stored next to the token so the dashboard can pick a landing page and
/// show a name without another round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Staff member's database ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Name shown in the dashboard header and on receipts.
    pub display_name: String,
    /// Role/permission level.
    pub role: Role,
}

/// An authenticated session: bearer token plus the profile it was issued for.
///
/// Both halves always travel together; "no session" is `Option<Session>`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Profile of the token holder.
    pub user: UserProfile,
}

impl Session {
    /// Create a session from a token and profile.
    #[must_use]
    pub const fn new(token: String, user: UserProfile) -> Self {
        Self { token, user }
    }

    /// Role of the session holder.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.user.role
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Login request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login response body.
///
/// Failed logins answer with an [`ApiErrorBody`](super::ApiErrorBody) instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self::new(response.token, response.user)
    }
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}
