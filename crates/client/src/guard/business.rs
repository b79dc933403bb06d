//! Root-level gate on the business configuration.

use tillpoint_core::BusinessType;

/// Entry point of the setup flow.
pub const SETUP_PATH: &str = "/setup";
/// Where a configured store sends visitors of the setup flow.
pub const ROOT_PATH: &str = "/";

/// What is known about the business configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BusinessState {
    /// Configuration not fetched yet.
    #[default]
    Loading,
    /// No business type saved.
    Unconfigured,
    /// Business type saved.
    Configured(BusinessType),
}

/// Outcome of the business gate for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Configuration still loading; show a placeholder.
    Loading,
    /// Let the route guard decide.
    Proceed,
    /// Navigate elsewhere.
    Redirect {
        /// Target path.
        to: &'static str,
    },
}

/// Gate that confines an unconfigured store to the setup flow and closes
/// the setup flow once configured.
///
/// State changes only through [`resolve`](Self::resolve), never as a side
/// effect of navigation.
#[derive(Debug, Clone, Default)]
pub struct BusinessGate {
    state: BusinessState,
}

impl BusinessGate {
    /// Gate in the `Loading` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BusinessState::Loading,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &BusinessState {
        &self.state
    }

    /// Record the fetched configuration.
    pub fn resolve(&mut self, business_type: Option<BusinessType>) {
        self.state = business_type.map_or(BusinessState::Unconfigured, BusinessState::Configured);
        tracing::debug!(state = ?self.state, "Business gate resolved");
    }

    /// Decide whether navigation to `requested` may continue.
    #[must_use]
    pub fn route(&self, requested: &str) -> GateDecision {
        let in_setup = is_setup_path(requested);
        match (&self.state, in_setup) {
            (BusinessState::Loading, _) => GateDecision::Loading,
            (BusinessState::Unconfigured, false) => GateDecision::Redirect { to: SETUP_PATH },
            (BusinessState::Configured(_), true) => GateDecision::Redirect { to: ROOT_PATH },
            (BusinessState::Unconfigured, true) | (BusinessState::Configured(_), false) => {
                GateDecision::Proceed
            }
        }
    }
}

fn is_setup_path(requested: &str) -> bool {
    let path = super::route::path_only(requested);
    path == SETUP_PATH
        || path
            .strip_prefix(SETUP_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}
