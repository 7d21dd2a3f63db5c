//! Account roles carried in access tokens.

use serde::{Deserialize, Serialize};

/// Role of an authenticated account.
///
/// Only customers own a remote cart; back-office accounts are authenticated
/// but not permitted to shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Storefront customer (`"user"` on the wire).
    #[serde(rename = "user")]
    Customer,
    /// Back-office administrator.
    Admin,
}

impl Role {
    /// Whether this role may own and mutate a remote cart.
    #[must_use]
    pub const fn can_shop(self) -> bool {
        matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
