//! Persistent client-side state shared across controllers.
//!
//! Only three values live here: the bearer token, the cart and the transient
//! pending-login payload. Controllers receive a [`LocalStore`] instead of
//! touching storage directly, and every read goes to the backend storage so
//! the latest value is always returned.
//!
//! Writers publish a [`StoreChange`] on a broadcast channel; consumers that
//! care about cross-component updates (a cart badge, the session tracker)
//! subscribe instead of polling.

mod storage;

use std::path::Path;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::PendingLogin;
use crate::cart::Cart;

pub use storage::{FileStorage, MemoryStorage, STORAGE_FILE_NAME, Storage, StoreError};

/// Storage keys.
pub mod keys {
    /// Bearer token for authenticated requests.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// JSON-serialized cart line items.
    pub const CART: &str = "avenue_cart";

    /// Login parked while the welcome coupon is shown.
    pub const PENDING_LOGIN: &str = "pending_login_data";
}

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Kind of change published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Set,
    Removed,
}

/// A change to one storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    /// Key that changed (one of [`keys`]).
    pub key: &'static str,
    /// What happened to it.
    pub kind: ChangeKind,
}

/// Typed access to persisted client state.
///
/// Cheaply cloneable; clones share the same storage and change channel.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn Storage>,
    changes: broadcast::Sender<StoreChange>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: impl Storage + 'static) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            storage: Arc::new(storage),
            changes,
        }
    }

    /// A store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// A store persisted under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(FileStorage::open(dir)?))
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    // =========================================================================
    // Auth token
    // =========================================================================

    /// The current bearer token, if logged in.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn auth_token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self
            .storage
            .get(keys::AUTH_TOKEN)?
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    /// Whether a token is present. Storage errors count as logged out.
    #[must_use]
    pub fn has_auth_token(&self) -> bool {
        self.auth_token().ok().flatten().is_some()
    }

    /// Persist a new bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set_auth_token(&self, token: &SecretString) -> Result<(), StoreError> {
        self.storage.set(keys::AUTH_TOKEN, token.expose_secret())?;
        self.notify(keys::AUTH_TOKEN, ChangeKind::Set);
        Ok(())
    }

    /// Remove the bearer token. Returns `true` only if one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear_auth_token(&self) -> Result<bool, StoreError> {
        let removed = self.storage.remove(keys::AUTH_TOKEN)?;
        if removed {
            self.notify(keys::AUTH_TOKEN, ChangeKind::Removed);
        }
        Ok(removed)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The persisted cart. A missing or unreadable cart is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn cart(&self) -> Result<Cart, StoreError> {
        match self.get_json::<Cart>(keys::CART) {
            Ok(cart) => Ok(cart.unwrap_or_default()),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Discarding unreadable cart");
                Ok(Cart::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.set_json(keys::CART, cart)
    }

    /// Remove the cart entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear_cart(&self) -> Result<(), StoreError> {
        if self.storage.remove(keys::CART)? {
            self.notify(keys::CART, ChangeKind::Removed);
        }
        Ok(())
    }

    // =========================================================================
    // Pending login
    // =========================================================================

    /// Login data parked while the welcome coupon is displayed.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the value is corrupt.
    pub fn pending_login(&self) -> Result<Option<PendingLogin>, StoreError> {
        self.get_json(keys::PENDING_LOGIN)
    }

    /// Park login data.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set_pending_login(&self, pending: &PendingLogin) -> Result<(), StoreError> {
        self.set_json(keys::PENDING_LOGIN, pending)
    }

    /// Read and remove the parked login data.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    pub fn take_pending_login(&self) -> Result<Option<PendingLogin>, StoreError> {
        let pending = self.pending_login()?;
        if self.storage.remove(keys::PENDING_LOGIN)? {
            self.notify(keys::PENDING_LOGIN, ChangeKind::Removed);
        }
        Ok(pending)
    }

    // =========================================================================
    // JSON helpers
    // =========================================================================

    /// Read a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the value does not parse.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.storage
            .get(key)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or written.
    pub fn set_json<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, &raw)?;
        self.notify(key, ChangeKind::Set);
        Ok(())
    }

    fn notify(&self, key: &'static str, kind: ChangeKind) {
        // No subscribers is fine
        let _ = self.changes.send(StoreChange { key, kind });
        debug!(key, ?kind, "Local store changed");
    }
}
