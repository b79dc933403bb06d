//! Staff roles.

use serde::{Deserialize, Serialize};

/// Staff role with different dashboard access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Back-office access: inventory, accounting, purchase orders, staff.
    Admin,
    /// Till access: sales and receipts.
    Cashier,
}

impl Role {
    /// Path of the dashboard this role lands on after login, and where a
    /// user is sent when they open a destination reserved for another role.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Cashier => "/cashier",
        }
    }

    /// Wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cashier => "cashier",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "cashier" => Ok(Self::Cashier),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
