//! Role-based route guard.

use tillpoint_core::{Role, RouteRequirement};

use crate::session::SessionState;

/// Login page.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of guarding one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet; show a placeholder.
    Loading,
    /// Show the destination.
    Render,
    /// No session; go to the login page.
    RedirectToLogin {
        /// Location the user asked for, so login can send them back.
        from: String,
    },
    /// Go somewhere else, e.g. the dashboard of the user's own role.
    Redirect {
        /// Target path.
        to: String,
    },
}

/// Decide whether the session may see a destination.
///
/// Precedence: an unresolved session shows a placeholder, a missing session
/// goes to login, a session with the wrong role goes to its own dashboard.
/// Public destinations always render.
#[must_use]
pub fn authorize(
    state: &SessionState,
    requirement: RouteRequirement,
    requested: &str,
) -> GuardDecision {
    if !requirement.needs_session() {
        return GuardDecision::Render;
    }

    let session = match state {
        SessionState::Loading => return GuardDecision::Loading,
        SessionState::Anonymous => {
            return GuardDecision::RedirectToLogin {
                from: requested.to_owned(),
            };
        }
        SessionState::Authenticated(session) => session,
    };

    match requirement.required_role() {
        Some(required) if required != session.role() => {
            tracing::debug!(
                %required,
                actual = %session.role(),
                requested,
                "Role mismatch, redirecting to own dashboard"
            );
            GuardDecision::Redirect {
                to: session.role().home_path().to_owned(),
            }
        }
        _ => GuardDecision::Render,
    }
}

/// Path-prefix rules mapping dashboard locations to requirements.
///
/// The longest matching prefix wins; a prefix matches the path itself and
/// anything below it (`/admin` matches `/admin/stock`, not `/administer`).
/// Unmatched paths require a logged-in user.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<(String, RouteRequirement)>,
}

impl RouteTable {
    /// Empty table: every path requires a logged-in user.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace a rule.
    #[must_use]
    pub fn with_rule(mut self, prefix: &str, requirement: RouteRequirement) -> Self {
        let prefix = normalize_prefix(prefix);
        self.rules.retain(|(existing, _)| *existing != prefix);
        self.rules.push((prefix, requirement));
        self
    }

    /// Requirement for a requested location (query and fragment ignored).
    #[must_use]
    pub fn resolve(&self, requested: &str) -> RouteRequirement {
        let path = path_only(requested);
        self.rules
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(RouteRequirement::Authenticated, |(_, requirement)| *requirement)
    }
}

impl Default for RouteTable {
    /// The POS dashboard layout.
    fn default() -> Self {
        Self::empty()
            .with_rule(LOGIN_PATH, RouteRequirement::Public)
            .with_rule(super::SETUP_PATH, RouteRequirement::Public)
            .with_rule(Role::Admin.home_path(), RouteRequirement::Role(Role::Admin))
            .with_rule(
                Role::Cashier.home_path(),
                RouteRequirement::Role(Role::Cashier),
            )
    }
}

/// Strip query string and fragment.
pub(super) fn path_only(requested: &str) -> &str {
    let end = requested.find(['?', '#']).unwrap_or(requested.len());
    requested.get(..end).unwrap_or(requested)
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
