//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod id;
pub mod line;
pub mod quantity;
pub mod role;
pub mod version;

pub use id::*;
pub use line::{CartLine, CartLines, VariantKey};
pub use quantity::{MAX_QUANTITY_PER_LINE, Quantity};
pub use role::Role;
pub use version::{CartVersion, ConcurrencyToken};
