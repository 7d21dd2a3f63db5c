//! Guest/remote cart synchronizer.
//!
//! [`CartSynchronizer`] owns the shopper's working cart. In guest mode every
//! mutation is applied locally and the whole cart is written to
//! [`GuestStorage`]. In remote mode mutations go to the cart service and the
//! returned cart replaces the working view.
//!
//! Remote protocol for the token-gated operations (set quantity, remove):
//!
//! 1. Send with the held concurrency token.
//! 2. On a version conflict, re-read once, adopt the fresh cart, and resend
//!    with the fresh token. The second result is final.
//! 3. On an authorization failure, persist the working view as the guest
//!    cart, switch to guest mode, and apply the mutation locally.
//! 4. On a transport failure the outcome is unknown: the token is marked
//!    suspect and the next gated mutation re-reads before sending.
//!
//! Every operation holds one async mutex for its whole duration, so at most
//! one mutation is in flight per synchronizer. The latest [`CartView`] is
//! published on a watch channel and can be read without waiting.

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use cartsync_core::wire::{KeyRequest, LineRequest};
use cartsync_core::{CartError, CartLine, CartLines, ConcurrencyToken, VariantKey};

use crate::error::{RemoteError, SyncError};
use crate::remote::{CartRemote, RemoteCart};
use crate::storage::GuestStorage;

/// Where the working cart lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Guest,
    Remote,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// How far the held concurrency token can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Token returned by the last successful response.
    Current(ConcurrencyToken),
    /// The last request's outcome is unknown; re-read before a gated write.
    Suspect,
}

/// Synchronizer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No usable session; the cart lives in guest storage.
    Guest { cart: CartLines },
    /// Signed in; the cart service is authoritative and `cart` mirrors its
    /// last response.
    Remote { cart: CartLines, token: TokenState },
}

impl SyncState {
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Guest { .. } => Mode::Guest,
            Self::Remote { .. } => Mode::Remote,
        }
    }

    /// The working cart.
    #[must_use]
    pub const fn cart(&self) -> &CartLines {
        match self {
            Self::Guest { cart } | Self::Remote { cart, .. } => cart,
        }
    }

    fn adopt(&mut self, remote: RemoteCart) {
        *self = Self::Remote {
            cart: remote.lines,
            token: TokenState::Current(remote.token),
        };
    }

    fn mark_suspect(&mut self) {
        if let Self::Remote { token, .. } = self {
            *token = TokenState::Suspect;
        }
    }
}

/// Read-only snapshot of the working cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub mode: Mode,
    pub lines: CartLines,
    pub total_items: u32,
}

impl From<&SyncState> for CartView {
    fn from(state: &SyncState) -> Self {
        let lines = state.cart().clone();
        Self {
            mode: state.mode(),
            total_items: lines.total_quantity(),
            lines,
        }
    }
}

/// A validated cart mutation.
enum Mutation {
    Add(CartLine),
    SetQuantity(CartLine),
    Remove(VariantKey),
}

impl Mutation {
    fn apply_local(&self, cart: &mut CartLines) -> Result<(), CartError> {
        match self {
            Self::Add(line) => cart.upsert(line.clone()),
            Self::SetQuantity(line) => cart.set_quantity(&line.key(), line.quantity)?,
            Self::Remove(key) => {
                cart.remove(key);
            }
        }
        Ok(())
    }

    async fn send<R: CartRemote>(
        &self,
        remote: &R,
        token: ConcurrencyToken,
    ) -> Result<RemoteCart, RemoteError> {
        match self {
            Self::Add(line) => remote.upsert(line).await,
            Self::SetQuantity(line) => remote.update_quantity(line, token).await,
            Self::Remove(key) => remote.remove(key, token).await,
        }
    }
}

/// Unified cart over guest storage and the cart service.
pub struct CartSynchronizer<R, S> {
    remote: R,
    storage: S,
    state: Mutex<SyncState>,
    view: watch::Sender<CartView>,
}

impl<R, S> CartSynchronizer<R, S>
where
    R: CartRemote,
    S: GuestStorage,
{
    /// Start in guest mode with whatever guest storage holds.
    pub async fn new(remote: R, storage: S) -> Self {
        let state = SyncState::Guest {
            cart: storage.load().await,
        };
        let (view, _) = watch::channel(CartView::from(&state));
        Self {
            remote,
            storage,
            state: Mutex::new(state),
            view,
        }
    }

    /// Receive every published view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.view.subscribe()
    }

    /// The latest published view. Never waits for an in-flight mutation.
    #[must_use]
    pub fn view(&self) -> CartView {
        self.view.borrow().clone()
    }

    /// A copy of the current state, waiting for any in-flight mutation.
    pub async fn snapshot(&self) -> SyncState {
        self.state.lock().await.clone()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn publish(&self, state: &SyncState) {
        self.view.send_replace(CartView::from(state));
    }

    /// Hydrate the remote cart after sign-in.
    ///
    /// A non-empty guest cart is merged into the remote cart and then
    /// cleared from storage; otherwise the remote cart is read. If either
    /// call fails the synchronizer stays in guest mode. Does nothing when
    /// already in remote mode.
    #[instrument(skip_all)]
    pub async fn start_session(&self) -> Mode {
        let mut state = self.state.lock().await;
        if matches!(*state, SyncState::Remote { .. }) {
            return Mode::Remote;
        }

        let guest = self.storage.load().await;
        let result = if guest.is_empty() {
            self.remote.read().await
        } else {
            self.remote.merge(&guest).await
        };

        match result {
            Ok(remote) => {
                if !guest.is_empty() {
                    if let Err(e) = self.storage.clear().await {
                        error!(error = %e, "failed to clear merged guest cart");
                    }
                    info!(lines = guest.len(), "guest cart merged into remote cart");
                }
                state.adopt(remote);
            }
            Err(e) => {
                warn!(error = %e, "cart hydration failed, staying in guest mode");
                *state = SyncState::Guest { cart: guest };
            }
        }

        self.publish(&state);
        state.mode()
    }

    /// Return to guest mode after sign-out.
    #[instrument(skip_all)]
    pub async fn end_session(&self) -> CartView {
        let mut state = self.state.lock().await;
        *state = SyncState::Guest {
            cart: self.storage.load().await,
        };
        self.publish(&state);
        CartView::from(&*state)
    }

    /// Refresh the working view from its source.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the remote read fails for any reason other
    /// than authorization.
    #[instrument(skip_all)]
    pub async fn reload(&self) -> Result<CartView, SyncError> {
        let mut state = self.state.lock().await;
        let result = match state.mode() {
            Mode::Guest => {
                *state = SyncState::Guest {
                    cart: self.storage.load().await,
                };
                Ok(())
            }
            Mode::Remote => match self.remote.read().await {
                Ok(remote) => {
                    state.adopt(remote);
                    Ok(())
                }
                Err(RemoteError::Unauthorized) => {
                    self.fall_back(&mut state).await;
                    Ok(())
                }
                Err(e) => {
                    if e.outcome_unknown() {
                        state.mark_suspect();
                    }
                    Err(e.into())
                }
            },
        };
        self.publish(&state);
        result.map(|()| CartView::from(&*state))
    }

    /// Add a line, summing with any existing line for the same variant.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for malformed input, or the failure
    /// of the remote call or guest storage.
    #[instrument(skip_all, fields(product_id = %request.product_id))]
    pub async fn add(&self, request: &LineRequest) -> Result<CartView, SyncError> {
        let line = request.validate()?;
        self.mutate(Mutation::Add(line)).await
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::LineNotFound` if no line has this variant, or
    /// `SyncError::VersionConflict` if the single retry also conflicted.
    #[instrument(skip_all, fields(product_id = %request.product_id))]
    pub async fn update_quantity(&self, request: &LineRequest) -> Result<CartView, SyncError> {
        let line = request.validate()?;
        self.mutate(Mutation::SetQuantity(line)).await
    }

    /// Remove a line. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::VersionConflict` if the single retry also
    /// conflicted, or a transport or storage failure.
    #[instrument(skip_all, fields(product_id = %request.product_id))]
    pub async fn remove(&self, request: &KeyRequest) -> Result<CartView, SyncError> {
        let key = request.validate()?;
        self.mutate(Mutation::Remove(key)).await
    }

    /// Empty the cart.
    ///
    /// In remote mode the cart is re-read and each line removed in turn,
    /// each removal following the gated protocol.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure; lines removed before it stay
    /// removed.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<CartView, SyncError> {
        let mut state = self.state.lock().await;
        let result = self.clear_locked(&mut state).await;
        self.publish(&state);
        result.map(|()| CartView::from(&*state))
    }

    async fn clear_locked(&self, state: &mut SyncState) -> Result<(), SyncError> {
        if matches!(state, SyncState::Remote { .. }) {
            match self.remote.read().await {
                Ok(remote) => state.adopt(remote),
                Err(RemoteError::Unauthorized) => self.fall_back(state).await,
                Err(e) => {
                    if e.outcome_unknown() {
                        state.mark_suspect();
                    }
                    return Err(e.into());
                }
            }
        }

        let keys: Vec<VariantKey> = state.cart().iter().map(CartLine::key).collect();
        for key in keys {
            self.apply(state, &Mutation::Remove(key)).await?;
        }
        Ok(())
    }

    async fn mutate(&self, mutation: Mutation) -> Result<CartView, SyncError> {
        let mut state = self.state.lock().await;
        let result = self.apply(&mut state, &mutation).await;
        self.publish(&state);
        debug!(mode = %state.mode(), ok = result.is_ok(), "cart mutation finished");
        result.map(|()| CartView::from(&*state))
    }

    async fn apply(&self, state: &mut SyncState, mutation: &Mutation) -> Result<(), SyncError> {
        if let SyncState::Guest { cart } = state {
            return self.apply_guest(cart, mutation).await;
        }

        match self.send_remote(state, mutation).await {
            Ok(remote) => {
                state.adopt(remote);
                Ok(())
            }
            Err(RemoteError::Unauthorized) => {
                self.fall_back(state).await;
                match state {
                    SyncState::Guest { cart } => self.apply_guest(cart, mutation).await,
                    SyncState::Remote { .. } => Ok(()),
                }
            }
            Err(e) => {
                if e.outcome_unknown() {
                    warn!(error = %e, "cart request outcome unknown, token now suspect");
                    state.mark_suspect();
                }
                Err(e.into())
            }
        }
    }

    /// Send a mutation in remote mode.
    ///
    /// Additive writes go straight out. Gated writes re-read first if the
    /// token is suspect and retry once on a version conflict.
    async fn send_remote(
        &self,
        state: &mut SyncState,
        mutation: &Mutation,
    ) -> Result<RemoteCart, RemoteError> {
        if let Mutation::Add(line) = mutation {
            return self.remote.upsert(line).await;
        }

        let token = match *state {
            SyncState::Remote {
                token: TokenState::Current(token),
                ..
            } => token,
            _ => {
                let fresh = self.remote.read().await?;
                let token = fresh.token;
                state.adopt(fresh);
                token
            }
        };

        match mutation.send(&self.remote, token).await {
            Err(RemoteError::VersionConflict) => {
                debug!("version conflict, re-reading cart and retrying once");
                let fresh = self.remote.read().await?;
                let token = fresh.token;
                state.adopt(fresh);
                mutation.send(&self.remote, token).await
            }
            other => other,
        }
    }

    /// Switch to guest mode keeping the working view as the guest cart.
    async fn fall_back(&self, state: &mut SyncState) {
        let cart = state.cart().clone();
        if let Err(e) = self.storage.save(&cart).await {
            error!(error = %e, "failed to persist cart on fallback to guest mode");
        }
        info!(lines = cart.len(), "authorization lost, continuing in guest mode");
        *state = SyncState::Guest { cart };
    }

    async fn apply_guest(&self, cart: &mut CartLines, mutation: &Mutation) -> Result<(), SyncError> {
        let mut next = cart.clone();
        mutation.apply_local(&mut next)?;
        self.storage.save(&next).await?;
        *cart = next;
        Ok(())
    }
}
