//! Integration tests for Go Marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p go-marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart behavior across app restarts on file storage
//!
//! This library holds the shared fixtures the test files use.

use std::path::Path;

use go_marketplace_cart::storage::FileStorage;
use go_marketplace_cart::{CartHandle, CartProvider, DEFAULT_STORAGE_KEY};
use go_marketplace_core::{NewCartItem, Price, ProductId};

/// Build a catalog product with a predictable title, image and price.
#[must_use]
pub fn product(id: &str, cents: i64) -> NewCartItem {
    NewCartItem {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        image_url: format!("https://cdn.example.com/products/{id}.png"),
        price: Price::from_cents(cents),
    }
}

/// Simulate an app launch: mount a fresh provider on file storage in `dir`.
///
/// # Errors
///
/// Returns `CartError::AlreadyMounted` only if the provider is reused, which
/// this helper never does.
pub async fn launch(dir: &Path) -> go_marketplace_cart::Result<CartHandle<FileStorage>> {
    CartProvider::new()
        .mount(FileStorage::new(dir), DEFAULT_STORAGE_KEY)
        .await
}
