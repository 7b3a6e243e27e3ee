//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE` - Storage backend: `memory`, `file` or `postgres` (default: file)
//! - `CART_STORAGE_DIR` - Directory for the `file` backend (default: .cart)
//! - `CART_STORAGE_KEY` - Key the cart blob is stored under (default: @GoMarketplace:items)
//! - `CART_DATABASE_URL` - `PostgreSQL` connection string (required for `postgres`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use crate::store::DEFAULT_STORAGE_KEY;

const DEFAULT_STORAGE_DIR: &str = ".cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the cart blob is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!(
                "unknown backend '{other}' (expected memory, file or postgres)"
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Postgres => "postgres",
        })
    }
}

/// Cart configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Directory used by the file backend
    pub storage_dir: PathBuf,
    /// Key the cart blob is stored under
    pub storage_key: String,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            database_url: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or if the `postgres`
    /// backend is selected without `CART_DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CartConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend = match get_optional("CART_STORAGE") {
            Some(raw) => raw
                .parse::<StorageBackend>()
                .map_err(|e| ConfigError::InvalidEnvVar("CART_STORAGE".to_string(), e))?,
            None => StorageBackend::default(),
        };

        let storage_dir = get_optional("CART_STORAGE_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);
        let storage_key =
            get_optional("CART_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_owned());
        let database_url = get_optional("CART_DATABASE_URL").map(SecretString::from);

        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("CART_DATABASE_URL".to_string()));
        }

        Ok(Self {
            backend,
            storage_dir,
            storage_key,
            database_url,
            sentry_dsn: get_optional("SENTRY_DSN"),
            sentry_environment: get_optional("SENTRY_ENVIRONMENT"),
        })
    }
}
