//! Development access tokens.
//!
//! # Usage
//!
//! ```bash
//! cartctl token issue --user u_123
//! cartctl token issue --user ops --role admin --ttl-secs 600
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_TOKEN_SECRET` - Signing secret shared with the storefront

use chrono::{Duration, Utc};
use thiserror::Error;

use cartsync_core::{Role, UserId, ValidationError};
use cartsync_storefront::config::{ConfigError, token_secret_from_env};
use cartsync_storefront::services::{AccessClaims, AuthError, TokenSigner};

/// Errors that can occur while issuing a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid user id: {0}")]
    InvalidUser(#[from] ValidationError),

    #[error("ttl must be positive (got {0})")]
    InvalidTtl(i64),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Issue a signed access token for `user`.
pub fn issue(user: &str, role: Role, ttl_secs: i64) -> Result<String, TokenError> {
    dotenvy::dotenv().ok();

    if ttl_secs <= 0 {
        return Err(TokenError::InvalidTtl(ttl_secs));
    }
    let user_id = UserId::parse(user)?;
    let signer = TokenSigner::new(token_secret_from_env()?);

    let claims = AccessClaims::new(user_id, role, Utc::now(), Duration::seconds(ttl_secs));
    let token = signer.issue(&claims)?;

    tracing::info!(user_id = %claims.sub, role = %role, exp = claims.exp, "Issued access token");
    Ok(token)
}
