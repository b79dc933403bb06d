//! Navigation guards.
//!
//! Two gates decide what the dashboard shows for a requested path:
//!
//! 1. [`BusinessGate`] - until a business type is configured, only the
//!    setup flow is reachable; afterwards the setup flow is closed.
//! 2. [`authorize`] - checks the session against the destination's
//!    [`RouteRequirement`](tillpoint_core::RouteRequirement).
//!
//! [`Navigator`] applies them in that order using a [`RouteTable`].

pub mod business;
pub mod route;

pub use business::{BusinessGate, BusinessState, GateDecision, ROOT_PATH, SETUP_PATH};
pub use route::{GuardDecision, LOGIN_PATH, RouteTable, authorize};

use crate::error::ApiError;
use crate::gateway::ApiClient;
use crate::session::SessionState;

/// Both gates plus the route table, evaluated per navigation.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    gate: BusinessGate,
    routes: RouteTable,
}

impl Navigator {
    /// Navigator with the POS route table and an unresolved business gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigator with a custom route table.
    #[must_use]
    pub fn with_routes(routes: RouteTable) -> Self {
        Self {
            gate: BusinessGate::new(),
            routes,
        }
    }

    /// The business gate.
    #[must_use]
    pub const fn gate(&self) -> &BusinessGate {
        &self.gate
    }

    /// Mutable access to the business gate, for resolving it.
    pub fn gate_mut(&mut self) -> &mut BusinessGate {
        &mut self.gate
    }

    /// Fetch the business type from the API and resolve the gate with it.
    ///
    /// # Errors
    ///
    /// Returns the request error; the gate keeps its previous state.
    pub async fn refresh_business(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let business_type = client.fetch_business_type().await?;
        self.gate.resolve(business_type);
        Ok(())
    }

    /// Decide what to show for `requested` given the current session.
    #[must_use]
    pub fn decide(&self, session: &SessionState, requested: &str) -> GuardDecision {
        match self.gate.route(requested) {
            GateDecision::Loading => GuardDecision::Loading,
            GateDecision::Redirect { to } => GuardDecision::Redirect { to: to.to_owned() },
            GateDecision::Proceed => {
                let requirement = self.routes.resolve(requested);
                authorize(session, requirement, requested)
            }
        }
    }
}
