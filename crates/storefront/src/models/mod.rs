//! Domain models for storefront.

pub mod cart;

pub use cart::Cart;
