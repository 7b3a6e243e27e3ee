//! Go Marketplace Cart - persisted shopping-cart state container.
//!
//! The cart holds an ordered list of [`CartItem`](go_marketplace_core::CartItem)s,
//! writes the whole list to a key/value store under one fixed key after every
//! change, and publishes an immutable snapshot that consumers read or subscribe to.
//!
//! # Usage
//!
//! ```rust,no_run
//! use go_marketplace_cart::{CartProvider, storage::MemoryStorage};
//! use go_marketplace_core::{NewCartItem, Price, ProductId};
//!
//! # async fn run() -> go_marketplace_cart::Result<()> {
//! let provider = CartProvider::new();
//! provider.mount(MemoryStorage::new(), "@GoMarketplace:items").await?;
//!
//! let cart = provider.cart()?;
//! cart.add_to_cart(NewCartItem {
//!     id: ProductId::new("1"),
//!     title: "Backpack".to_owned(),
//!     image_url: "https://example.com/backpack.png".to_owned(),
//!     price: Price::from_cents(14990),
//! })
//! .await?;
//! assert_eq!(cart.item_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`store`] - `CartStore` and its mutation operations
//! - [`provider`] - Mount-once access point handing out `CartHandle`s
//! - [`storage`] - Key/value backends (memory, file, Postgres)
//! - [`config`] - Environment configuration
//! - [`error`] - Error types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, StorageBackend};
pub use error::{CartError, Result};
pub use provider::{CartHandle, CartProvider};
pub use store::{CartStore, DEFAULT_STORAGE_KEY};
