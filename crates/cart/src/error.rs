//! Cart error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart was requested before a provider mounted it.
    #[error("cart accessed outside of a mounted CartProvider")]
    OutsideProvider,

    /// `mount` was called on a provider that already holds a cart.
    #[error("cart provider is already mounted")]
    AlreadyMounted,

    /// Reading or writing the persisted blob failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart list could not be encoded or the stored blob could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CartError {
    /// Whether this error comes from misusing the cart API rather than from persistence.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(self, Self::OutsideProvider | Self::AlreadyMounted)
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
