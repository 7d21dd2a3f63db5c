//! Cartsync Core - Shared cart types library.
//!
//! This crate provides the types shared by every cartsync component:
//! - `storefront` - Server hosting the authoritative per-user cart
//! - `client` - Cart synchronizer (guest/remote reconciliation)
//! - `cli` - Command-line tools for migrations and cart operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart logic - no I/O, no
//! database access, no HTTP clients. Both sides of the wire apply the same
//! variant-key and quantity rules by calling into this crate.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, quantities, cart lines, versions and tokens
//! - [`wire`] - JSON request/response bodies and header names
//! - [`error`] - Validation and cart-operation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod types;
pub mod wire;

pub use error::{CartError, ValidationError};
pub use types::*;
