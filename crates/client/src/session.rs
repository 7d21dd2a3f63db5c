//! Access-token session with single-flight refresh.
//!
//! When several requests see an expired token at once, exactly one refresh
//! runs and every caller awaits its result. The in-flight refresh is a
//! [`Shared`] future parked in a slot; the slot is cleared once it resolves
//! so a later expiry starts a fresh refresh.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use secrecy::SecretString;
use thiserror::Error;

/// Why a token refresh failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No refresher is configured.
    #[error("token refresh unavailable")]
    Unavailable,

    /// The auth service refused to issue a new token.
    #[error("token refresh rejected: {0}")]
    Rejected(String),

    /// The auth service could not be reached.
    #[error("token refresh failed: {0}")]
    Transport(String),
}

/// Source of fresh access tokens (the external auth service).
pub trait TokenRefresher: Send + Sync {
    /// Obtain a new access token.
    fn refresh(&self) -> BoxFuture<'static, Result<SecretString, RefreshError>>;
}

/// Runs at most one instance of an async operation at a time.
///
/// Callers arriving while an operation is in flight share its output
/// instead of starting another.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight operation, or start one with `start`.
    pub async fn run<F>(&self, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let flight = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let flight = start().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let output = flight.clone().await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|current| Shared::ptr_eq(current, &flight))
        {
            *slot = None;
        }
        output
    }

    /// Whether an operation is currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// The shopper's access token and how to renew it.
pub struct Session {
    token: RwLock<Option<SecretString>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh: SingleFlight<Result<SecretString, RefreshError>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.access_token().map(|_| "[REDACTED]"))
            .field("refresher", &self.refresher.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session without token refresh.
    #[must_use]
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            token: RwLock::new(token),
            refresher: None,
            refresh: SingleFlight::new(),
        }
    }

    /// A session that renews its token through `refresher`.
    #[must_use]
    pub fn with_refresher(token: Option<SecretString>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher: Some(refresher),
            ..Self::new(token)
        }
    }

    /// The current access token, if signed in.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the access token (sign-in or sign-out).
    pub fn set_access_token(&self, token: Option<SecretString>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Obtain a fresh access token, sharing any refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Unavailable` without a refresher, or the
    /// refresher's error.
    pub async fn refresh(&self) -> Result<SecretString, RefreshError> {
        let Some(refresher) = self.refresher.clone() else {
            return Err(RefreshError::Unavailable);
        };

        let result = self.refresh.run(move || refresher.refresh()).await;
        match &result {
            Ok(token) => {
                tracing::debug!("access token refreshed");
                self.set_access_token(Some(token.clone()));
            }
            Err(e) => tracing::warn!(error = %e, "access token refresh failed"),
        }
        result
    }
}
