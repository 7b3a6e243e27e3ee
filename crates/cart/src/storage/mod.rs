//! Key/value storage backends for the persisted cart blob.
//!
//! The cart only needs three operations on a string-keyed, string-valued
//! store: `get`, `set` and `remove`. Backends:
//!
//! - [`MemoryStorage`] - in-process map, lost on exit
//! - [`FileStorage`] - one file per key in a local directory
//! - `PgStorage` - `PostgreSQL` table (feature `postgres`)
//!
//! [`Storage`] wraps whichever backend the configuration selects.

use std::future::Future;

use thiserror::Error;

use crate::config::{CartConfig, StorageBackend};

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::FileStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PgStorage;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend cannot serve requests.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// An asynchronous string key/value store.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Runtime-selected storage backend.
#[derive(Debug, Clone)]
pub enum Storage {
    Memory(MemoryStorage),
    File(FileStorage),
    #[cfg(feature = "postgres")]
    Postgres(PgStorage),
}

impl Storage {
    /// Open the backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the Postgres backend is selected
    /// without a database URL or without the `postgres` feature, and
    /// `StorageError::Database` if the connection cannot be established.
    pub async fn open(config: &CartConfig) -> Result<Self, StorageError> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::Memory(MemoryStorage::new())),
            StorageBackend::File => Ok(Self::File(FileStorage::new(&config.storage_dir))),
            StorageBackend::Postgres => open_postgres(config).await,
        }
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &CartConfig) -> Result<Storage, StorageError> {
    let database_url = config.database_url.as_ref().ok_or_else(|| {
        StorageError::Unavailable("CART_DATABASE_URL is required for postgres storage".to_owned())
    })?;
    Ok(Storage::Postgres(PgStorage::connect(database_url).await?))
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn open_postgres(_config: &CartConfig) -> Result<Storage, StorageError> {
    Err(StorageError::Unavailable(
        "built without the `postgres` feature".to_owned(),
    ))
}

impl KeyValueStorage for Storage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Memory(s) => s.get(key).await,
            Self::File(s) => s.get(key).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.set(key, value).await,
            Self::File(s) => s.set(key, value).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(s) => s.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Memory(s) => s.remove(key).await,
            Self::File(s) => s.remove(key).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(s) => s.remove(key).await,
        }
    }
}
