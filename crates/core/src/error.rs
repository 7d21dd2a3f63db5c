//! Errors shared by the cart store and the synchronizer.

use thiserror::Error;

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An identifier field was empty.
    #[error("{field} cannot be empty")]
    EmptyId {
        /// Wire name of the offending field.
        field: &'static str,
    },

    /// An identifier field exceeded the maximum length.
    #[error("{field} must be at most {max} characters")]
    IdTooLong {
        /// Wire name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },

    /// An identifier field contained characters outside `[A-Za-z0-9_-]`.
    #[error("{field} contains invalid characters")]
    InvalidIdCharacters {
        /// Wire name of the offending field.
        field: &'static str,
    },

    /// Quantity below the minimum of one.
    #[error("quantity must be at least 1 (got {0})")]
    QuantityOutOfRange(i64),
}

/// Errors from applying an operation to a cart document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The request was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The concurrency token did not match the stored version.
    #[error("cart was modified concurrently")]
    VersionConflict,

    /// No line matches the requested variant key.
    #[error("cart line not found")]
    LineNotFound,
}
