//! Mount-once access point for the cart.
//!
//! The application builds one [`CartProvider`] at startup, mounts it (which
//! loads the persisted cart), and passes [`CartHandle`]s to whatever needs
//! the cart. Asking for the cart before mounting is a usage error.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::error::{CartError, Result};
use crate::storage::KeyValueStorage;
use crate::store::CartStore;

/// Shared handle to a mounted cart.
pub type CartHandle<S> = Arc<CartStore<S>>;

/// Holds the application's single cart once it has been mounted.
pub struct CartProvider<S> {
    cart: OnceLock<CartHandle<S>>,
}

impl<S> Default for CartProvider<S> {
    fn default() -> Self {
        Self {
            cart: OnceLock::new(),
        }
    }
}

impl<S: KeyValueStorage> CartProvider<S> {
    /// Create an unmounted provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cart on `storage` under `key`, load it, and make it available.
    ///
    /// A cart that fails to load starts empty; the failure is logged and
    /// mounting still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AlreadyMounted` if this provider already holds a cart.
    pub async fn mount(&self, storage: S, key: impl Into<String>) -> Result<CartHandle<S>> {
        if self.cart.get().is_some() {
            return Err(CartError::AlreadyMounted);
        }

        let store = CartStore::new(storage, key);
        if let Err(e) = store.load().await {
            warn!(key = store.key(), error = %e, "Cart failed to load, starting empty");
        }

        let handle = Arc::new(store);
        self.cart
            .set(Arc::clone(&handle))
            .map_err(|_| CartError::AlreadyMounted)?;

        info!(
            key = handle.key(),
            lines = handle.products().len(),
            "Cart mounted"
        );
        Ok(handle)
    }

    /// Whether [`CartProvider::mount`] has completed.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.cart.get().is_some()
    }

    /// Get a handle to the mounted cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OutsideProvider` if the provider has not been mounted.
    pub fn cart(&self) -> Result<CartHandle<S>> {
        self.cart.get().cloned().ok_or(CartError::OutsideProvider)
    }
}
