//! Cart commands.
//!
//! Each invocation mounts the configured cart, applies one action, and prints
//! the resulting cart to stdout.

use std::fmt;

use go_marketplace_cart::storage::Storage;
use go_marketplace_cart::{CartConfig, CartHandle, CartProvider};
use go_marketplace_core::{CartItem, NewCartItem, ProductId};
use tracing::info;

/// One cart operation requested on the command line.
#[derive(Debug)]
pub enum CartAction {
    Show,
    Add(NewCartItem),
    Increment(ProductId),
    Decrement(ProductId),
    Clear,
}

/// Mount the cart on the configured backend.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be opened.
pub async fn open(config: &CartConfig) -> Result<CartHandle<Storage>, Box<dyn std::error::Error>> {
    let storage = Storage::open(config).await?;
    info!(
        backend = storage.backend_name(),
        key = %config.storage_key,
        "Opening cart"
    );

    let provider = CartProvider::new();
    Ok(provider.mount(storage, config.storage_key.clone()).await?)
}

/// Apply `action` to the configured cart and print the result.
///
/// # Errors
///
/// Returns an error if the cart cannot be opened or the change cannot be persisted.
pub async fn execute(
    config: &CartConfig,
    action: CartAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let cart = open(config).await?;

    match action {
        CartAction::Show => {}
        CartAction::Add(item) => cart.add_to_cart(item).await?,
        CartAction::Increment(id) => cart.increment(&id).await?,
        CartAction::Decrement(id) => cart.decrement(&id).await?,
        CartAction::Clear => cart.clear().await?,
    }

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(&cart.products(), cart.item_count()));
    }
    Ok(())
}

/// Format cart lines as a plain-text table.
pub fn render(products: &[CartItem], item_count: u64) -> String {
    CartTable {
        products,
        item_count,
    }
    .to_string()
}

struct CartTable<'a> {
    products: &'a [CartItem],
    item_count: u64,
}

impl fmt::Display for CartTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.products.is_empty() {
            return writeln!(f, "Cart is empty");
        }

        let id_width = self
            .products
            .iter()
            .map(|item| item.id.as_str().len())
            .max()
            .unwrap_or(0)
            .max(2);
        let title_width = self
            .products
            .iter()
            .map(|item| item.title.chars().count())
            .max()
            .unwrap_or(0)
            .max(5);

        writeln!(
            f,
            "{:<id_width$}  {:<title_width$}  {:>5}  {:>10}",
            "ID", "TITLE", "QTY", "PRICE"
        )?;
        for item in self.products {
            writeln!(
                f,
                "{:<id_width$}  {:<title_width$}  {:>5}  {:>10}",
                item.id.as_str(),
                item.title,
                item.quantity,
                item.price.to_string()
            )?;
        }
        writeln!(f, "Items: {}", self.item_count)
    }
}
