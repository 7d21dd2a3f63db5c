//! Cart domain type.
//!
//! Separate from the database row type; the repositories convert between
//! the two.

use chrono::{DateTime, Utc};

use cartsync_core::{CartLines, CartVersion, ConcurrencyToken, UserId};

/// The authoritative cart document of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    /// Owner. One cart per user.
    pub user_id: UserId,
    /// Lines in insertion order.
    pub lines: CartLines,
    /// Stored version, bumped by every mutation.
    pub version: CartVersion,
    /// When the cart was lazily created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A freshly created, empty cart.
    #[must_use]
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lines: CartLines::new(),
            version: CartVersion::INITIAL,
            created_at: now,
            updated_at: now,
        }
    }

    /// Token clients must present to mutate this version.
    #[must_use]
    pub const fn token(&self) -> ConcurrencyToken {
        self.version.token()
    }
}
