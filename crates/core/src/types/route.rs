//! Navigation requirements attached to dashboard destinations.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// What a destination demands of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum RouteRequirement {
    /// Reachable without logging in (login page, setup flow).
    Public,
    /// Any logged-in user.
    #[default]
    Authenticated,
    /// Logged-in user holding exactly this role.
    Role(Role),
}

impl RouteRequirement {
    /// The role a session must hold, if any.
    #[must_use]
    pub const fn required_role(self) -> Option<Role> {
        match self {
            Self::Role(role) => Some(role),
            Self::Public | Self::Authenticated => None,
        }
    }

    /// Whether a session is needed at all.
    #[must_use]
    pub const fn needs_session(self) -> bool {
        !matches!(self, Self::Public)
    }
}
