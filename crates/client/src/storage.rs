//! Guest cart persistence.
//!
//! The guest cart is a JSON array of cart lines stored under one fixed key
//! and read or written wholesale. Unreadable or corrupt data loads as an
//! empty cart so a damaged file can never block the shopper.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use cartsync_core::{CartLine, CartLines};

/// Fixed storage key of the guest cart.
pub const GUEST_CART_KEY: &str = "guest_cart_v1";

/// Errors writing the guest cart.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("guest cart storage failed: {0}")]
    Io(#[from] io::Error),

    /// The cart could not be serialized.
    #[error("guest cart encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Local persistence for the guest cart.
pub trait GuestStorage: Send + Sync {
    /// Load the guest cart; missing or corrupt data yields an empty cart.
    fn load(&self) -> impl Future<Output = CartLines> + Send;

    /// Replace the stored guest cart.
    fn save(&self, lines: &CartLines) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove the stored guest cart.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Decode a stored guest cart, normalizing whatever is found.
fn decode(raw: &[u8]) -> CartLines {
    match serde_json::from_slice::<Vec<CartLine>>(raw) {
        Ok(lines) => CartLines::sanitized(lines),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable guest cart");
            CartLines::new()
        }
    }
}

/// Guest cart stored as `<dir>/guest_cart_v1.json`.
#[derive(Debug, Clone)]
pub struct FileGuestStorage {
    path: PathBuf,
}

impl FileGuestStorage {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{GUEST_CART_KEY}.json")),
        }
    }

    /// Location of the guest cart file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GuestStorage for FileGuestStorage {
    async fn load(&self) -> CartLines {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => CartLines::new(),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "guest cart unreadable");
                CartLines::new()
            }
        }
    }

    async fn save(&self, lines: &CartLines) -> Result<(), StorageError> {
        let json = serde_json::to_vec(lines)?;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Write then rename so a crash never leaves a truncated cart
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Guest cart held in memory, stored as serialized JSON like the file
/// backend. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuestStorage {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryGuestStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with raw bytes.
    #[must_use]
    pub fn with_raw(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// Whether anything is stored.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl GuestStorage for MemoryGuestStorage {
    async fn load(&self) -> CartLines {
        let raw = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        raw.map_or_else(CartLines::new, |raw| decode(&raw))
    }

    async fn save(&self, lines: &CartLines) -> Result<(), StorageError> {
        let json = serde_json::to_vec(lines)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::{ProductId, Quantity, SizeId, VariantKey};

    use super::*;

    fn lines() -> CartLines {
        let mut lines = CartLines::new();
        lines.upsert(CartLine::new(
            VariantKey::new(
                ProductId::parse("p1").unwrap(),
                Some(SizeId::parse("s1").unwrap()),
                None,
            ),
            Quantity::clamped(3),
        ));
        lines
    }

    #[tokio::test]
    async fn test_file_storage_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileGuestStorage::new(dir.path().join("nested"));

        assert!(storage.load().await.is_empty());

        storage.save(&lines()).await.unwrap();
        assert_eq!(storage.load().await, lines());
        assert!(storage.path().ends_with("guest_cart_v1.json"));

        storage.clear().await.unwrap();
        assert!(storage.load().await.is_empty());
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_uses_wire_shape() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileGuestStorage::new(dir.path());
        storage.save(&lines()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(storage.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([{"productId":"p1","sizeId":"s1","colorId":null,"quantity":3}])
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileGuestStorage::new(dir.path());
        std::fs::write(storage.path(), b"{not json").unwrap();
        assert!(storage.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_stored_duplicates_are_folded() {
        let storage = MemoryGuestStorage::with_raw(
            r#"[{"productId":"p1","sizeId":"s1","colorId":null,"quantity":3},
                {"productId":"p1","sizeId":"s1","colorId":null,"quantity":19},
                {"productId":"","quantity":1}]"#,
        );
        let loaded = storage.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.as_slice()[0].quantity, Quantity::MAX);
    }
}
