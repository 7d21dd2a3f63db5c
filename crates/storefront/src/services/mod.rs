//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Access-token verification
//! - `cart` - Cart store with optimistic concurrency

pub mod auth;
pub mod cart;

pub use auth::{AccessClaims, AuthError, TokenSigner};
pub use cart::{CartStore, StoreError};
