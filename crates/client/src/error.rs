//! Client error types.

use thiserror::Error;

use cartsync_core::{CartError, ValidationError};

use crate::storage::StorageError;

/// Outcome of a failed call to the cart service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The access token was missing, expired, or not permitted to shop.
    #[error("not authorized for remote cart")]
    Unauthorized,

    /// The concurrency token was stale.
    #[error("cart was modified concurrently")]
    VersionConflict,

    /// The target line does not exist.
    #[error("cart line not found")]
    LineNotFound,

    /// The service rejected the request as invalid.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The service failed.
    #[error("cart service error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, if any.
        message: String,
    },

    /// The request timed out or the connection failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A success response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether the request may or may not have been applied.
    ///
    /// After such a failure the held concurrency token cannot be trusted.
    #[must_use]
    pub const fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::InvalidResponse(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by [`crate::CartSynchronizer`] operations.
///
/// Authorization failures never appear here; they switch the synchronizer
/// to guest mode instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input was rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation conflicted again after its single retry.
    #[error("cart was modified concurrently")]
    VersionConflict,

    /// The target line does not exist.
    #[error("cart line not found")]
    LineNotFound,

    /// Network failure or timeout; the outcome is unknown.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The cart service rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The cart service failed.
    #[error("cart service error: {0}")]
    Server(String),

    /// The guest cart could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<CartError> for SyncError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Validation(e) => Self::Validation(e),
            CartError::VersionConflict => Self::VersionConflict,
            CartError::LineNotFound => Self::LineNotFound,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::VersionConflict => Self::VersionConflict,
            RemoteError::LineNotFound => Self::LineNotFound,
            RemoteError::Rejected(message) => Self::Rejected(message),
            RemoteError::Transport(message) => Self::Transport(message),
            RemoteError::InvalidResponse(message) => Self::Transport(message),
            RemoteError::Server { status, message } => Self::Server(format!("{status}: {message}")),
            // Handled as a mode transition before reaching callers
            RemoteError::Unauthorized => Self::Server("unauthorized".to_string()),
        }
    }
}
