//! Access-token signing and verification.
//!
//! Tokens are issued by the external auth service; the storefront only
//! verifies them. The format is
//! `base64url(json claims) "." hex(hmac_sha256(secret, payload))`.
//!
//! [`TokenSigner::issue`] exists for development tooling and tests.

mod error;

pub use error::AuthError;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use cartsync_core::{Role, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id).
    pub sub: UserId,
    /// Account role.
    pub role: Role,
    /// Expiry as unix seconds.
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for `user_id` expiring `ttl` from `now`.
    #[must_use]
    pub fn new(user_id: UserId, role: Role, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id,
            role,
            exp: (now + ttl).timestamp(),
        }
    }

    /// Whether the claims have expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Issue a token for `claims`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Encoding` if the claims cannot be serialized.
    pub fn issue(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        let json = serde_json::to_vec(claims).map_err(|e| AuthError::Encoding(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = self.mac(payload.as_bytes())?;
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked in constant time before the payload is
    /// decoded.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Malformed`, `AuthError::InvalidSignature`, or
    /// `AuthError::Expired`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::Malformed)?;

        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Malformed)?;
        let claims: AccessClaims =
            serde_json::from_slice(&json).map_err(|_| AuthError::Malformed)?;

        if !claims.sub.is_valid() {
            return Err(AuthError::Malformed);
        }
        if claims.is_expired(now) {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        mac.update(payload);
        Ok(mac)
    }
}
