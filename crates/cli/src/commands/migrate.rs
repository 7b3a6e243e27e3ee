//! Storage migration command.
//!
//! # Usage
//!
//! ```bash
//! CART_STORAGE=postgres CART_DATABASE_URL=postgres://localhost/go_marketplace gm-cart migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CART_DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Cart storage migrations: `crates/cart/migrations/`

use go_marketplace_cart::CartConfig;
use go_marketplace_cart::storage::{PgStorage, StorageError};

/// Errors from running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run cart storage migrations against `CART_DATABASE_URL`.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run(config: &CartConfig) -> Result<(), MigrationError> {
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(MigrationError::MissingEnvVar("CART_DATABASE_URL"))?;

    tracing::info!("Connecting to cart database...");
    let storage = PgStorage::connect(database_url).await?;

    tracing::info!("Running cart storage migrations...");
    storage.migrate().await?;

    tracing::info!("Cart storage migrations complete!");
    Ok(())
}
