//! Access-token error types.

use thiserror::Error;

/// Errors that can occur while issuing or verifying access tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Token is not `payload.signature` or a part fails to decode.
    #[error("malformed access token")]
    Malformed,

    /// Signature does not match the payload.
    #[error("invalid access token signature")]
    InvalidSignature,

    /// Token is past its expiry.
    #[error("access token expired")]
    Expired,

    /// Claims could not be encoded.
    #[error("failed to encode claims: {0}")]
    Encoding(String),

    /// The signing key was rejected.
    #[error("invalid signing key")]
    InvalidKey,
}
