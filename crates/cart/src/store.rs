//! The cart state container.
//!
//! `CartStore` owns the ordered list of cart lines. Every mutation builds a
//! new list, writes the whole list to storage under the cart key, and only
//! then publishes it. If the write fails the published list is unchanged.
//!
//! Mutations are serialized: each one holds the write lock across its
//! read-modify-persist-publish cycle, so overlapping calls never work from a
//! stale snapshot and no update is lost.

use std::sync::Arc;

use go_marketplace_core::{CartItem, NewCartItem, ProductId};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::storage::KeyValueStorage;

/// Storage key the cart blob lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketplace:items";

/// Immutable view of the cart lines at one point in time.
pub type Snapshot = Arc<[CartItem]>;

/// In-memory cart backed by a key/value store.
pub struct CartStore<S> {
    storage: S,
    key: String,
    products: watch::Sender<Snapshot>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStorage> CartStore<S> {
    /// Create an empty cart persisted under `key`.
    ///
    /// Nothing is read from storage until [`CartStore::load`] is called.
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            products: watch::Sender::new(Arc::from(Vec::new())),
            write_lock: Mutex::new(()),
        }
    }

    /// The storage key this cart persists under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current cart lines, in insertion order.
    #[must_use]
    pub fn products(&self) -> Snapshot {
        self.products.borrow().clone()
    }

    /// Receiver that is notified each time a new list is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.products.subscribe()
    }

    /// Look up a single line by product ID.
    #[must_use]
    pub fn item(&self, id: &ProductId) -> Option<CartItem> {
        self.products.borrow().iter().find(|item| item.id == *id).cloned()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.products
            .borrow()
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Read the persisted list and make it the current cart.
    ///
    /// A missing key leaves the cart empty. A blob that cannot be decoded
    /// also leaves the cart empty, and the decode error is returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the read fails and
    /// `CartError::Serialization` if the stored blob is not a valid cart.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn load(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let blob = self
            .storage
            .get(&self.key)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read persisted cart"))?;

        let Some(blob) = blob else {
            debug!("No persisted cart found");
            return Ok(());
        };

        let items: Vec<CartItem> = serde_json::from_str(&blob)
            .inspect_err(|e| warn!(error = %e, "Persisted cart is unreadable, starting empty"))?;

        info!(lines = items.len(), "Loaded persisted cart");
        self.products.send_replace(Arc::from(items));
        Ok(())
    }

    /// Add a product to the cart.
    ///
    /// A product already in the cart has its quantity raised by one, exactly
    /// like [`CartStore::increment`]. A new product is appended with quantity 1.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the updated list cannot be persisted.
    #[instrument(skip(self, item), fields(product_id = %item.id))]
    pub async fn add_to_cart(&self, item: NewCartItem) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let current = self.products();
        if current.iter().any(|line| line.id == item.id) {
            return self.update_line(&item.id, CartItem::incremented).await;
        }

        let mut next = current.to_vec();
        next.push(item.with_quantity(1));
        self.commit(next).await?;

        debug!("Added new line");
        Ok(())
    }

    /// Raise the quantity of a line by one. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the updated list cannot be persisted.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn increment(&self, id: &ProductId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_line(id, CartItem::incremented).await
    }

    /// Lower the quantity of a line by one. Unknown IDs are ignored.
    ///
    /// Quantity stops at zero and the line stays in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the updated list cannot be persisted.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn decrement(&self, id: &ProductId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_line(id, CartItem::decremented).await
    }

    /// Empty the cart and delete the persisted blob.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the key cannot be removed.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.storage
            .remove(&self.key)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to remove persisted cart"))?;

        self.products.send_replace(Arc::from(Vec::new()));
        info!("Cart cleared");
        Ok(())
    }

    /// Replace the line for `id` with `update(line)`, keeping its position.
    ///
    /// Caller must hold `write_lock`.
    async fn update_line(
        &self,
        id: &ProductId,
        update: impl FnOnce(&CartItem) -> CartItem,
    ) -> Result<()> {
        let mut next = self.products().to_vec();
        let Some(line) = next.iter_mut().find(|line| line.id == *id) else {
            debug!("Product not in cart, nothing to update");
            return Ok(());
        };

        *line = update(line);
        let quantity = line.quantity;

        self.commit(next).await?;
        debug!(quantity, "Updated line quantity");
        Ok(())
    }

    /// Persist `next` and publish it.
    ///
    /// Caller must hold `write_lock`.
    async fn commit(&self, next: Vec<CartItem>) -> Result<()> {
        let blob = serde_json::to_string(&next)
            .inspect_err(|e| error!(error = %e, "Failed to serialize cart"))?;

        self.storage
            .set(&self.key, &blob)
            .await
            .inspect_err(|e| error!(key = %self.key, error = %e, "Failed to persist cart"))?;

        self.products.send_replace(Arc::from(next));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use go_marketplace_core::Price;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::CartError;
    use crate::storage::{MemoryStorage, StorageError};

    fn product(id: &str) -> NewCartItem {
        NewCartItem {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            image_url: format!("https://cdn.example.com/{id}.png"),
            price: Price::from_cents(1000),
        }
    }

    fn store() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY)
    }

    fn quantities(store: &CartStore<MemoryStorage>) -> Vec<(String, u32)> {
        store
            .products()
            .iter()
            .map(|item| (item.id.to_string(), item.quantity))
            .collect()
    }

    // =========================================================================
    // Add / Increment / Decrement
    // =========================================================================

    #[tokio::test]
    async fn test_add_new_item_starts_at_one() {
        let store = store();
        store.add_to_cart(product("1")).await.unwrap();

        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0], product("1").with_quantity(1));
    }

    #[tokio::test]
    async fn test_add_existing_item_increments() {
        let store = store();
        store.add_to_cart(product("1")).await.unwrap();
        store.add_to_cart(product("1")).await.unwrap();

        assert_eq!(quantities(&store), vec![("1".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let store = store();
        for id in ["b", "a", "c"] {
            store.add_to_cart(product(id)).await.unwrap();
        }
        store.add_to_cart(product("a")).await.unwrap();

        assert_eq!(
            quantities(&store),
            vec![
                ("b".to_string(), 1),
                ("a".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_increment_missing_is_noop() {
        let storage = MemoryStorage::new();
        let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
        store.add_to_cart(product("1")).await.unwrap();
        let before = store.products();

        // Nothing is written for an unknown ID
        storage.set_failing(true);
        store.increment(&ProductId::new("missing-id")).await.unwrap();
        storage.set_failing(false);

        assert_eq!(store.products(), before);
    }

    #[tokio::test]
    async fn test_increment_keeps_position() {
        let store = store();
        for id in ["1", "2", "3"] {
            store.add_to_cart(product(id)).await.unwrap();
        }
        store.increment(&ProductId::new("2")).await.unwrap();

        assert_eq!(
            quantities(&store),
            vec![
                ("1".to_string(), 1),
                ("2".to_string(), 2),
                ("3".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_decrement_to_zero_keeps_line() {
        let store = store();
        store.add_to_cart(product("1")).await.unwrap();
        store.add_to_cart(product("1")).await.unwrap();

        store.decrement(&ProductId::new("1")).await.unwrap();
        store.decrement(&ProductId::new("1")).await.unwrap();
        assert_eq!(quantities(&store), vec![("1".to_string(), 0)]);

        store.decrement(&ProductId::new("1")).await.unwrap();
        assert_eq!(quantities(&store), vec![("1".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_decrement_missing_is_noop() {
        let store = store();
        store.decrement(&ProductId::new("nope")).await.unwrap();
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_item_and_count() {
        let store = store();
        store.add_to_cart(product("1")).await.unwrap();
        store.add_to_cart(product("2")).await.unwrap();
        store.increment(&ProductId::new("2")).await.unwrap();

        assert_eq!(store.item_count(), 3);
        assert_eq!(store.item(&ProductId::new("2")).map(|i| i.quantity), Some(2));
        assert_eq!(store.item(&ProductId::new("3")), None);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[tokio::test]
    async fn test_every_mutation_persists_full_list() {
        let storage = MemoryStorage::new();
        let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);

        store.add_to_cart(product("1")).await.unwrap();
        store.add_to_cart(product("2")).await.unwrap();
        store.decrement(&ProductId::new("1")).await.unwrap();

        let blob = storage.get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        let persisted: Vec<CartItem> = serde_json::from_str(&blob).unwrap();
        assert_eq!(persisted, store.products().to_vec());
    }

    #[tokio::test]
    async fn test_load_restores_persisted_list() {
        let storage = MemoryStorage::new();
        let first = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
        first.add_to_cart(product("1")).await.unwrap();
        first.add_to_cart(product("2")).await.unwrap();
        first.increment(&ProductId::new("1")).await.unwrap();

        let second = CartStore::new(storage, DEFAULT_STORAGE_KEY);
        assert!(second.products().is_empty());
        second.load().await.unwrap();

        assert_eq!(second.products(), first.products());
    }

    #[tokio::test]
    async fn test_load_does_not_clear_storage() {
        let blob = r#"[{"id":"1","title":"A","image_url":"u","price":10,"quantity":3}]"#;
        let storage = MemoryStorage::with_entry(DEFAULT_STORAGE_KEY, blob);
        let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);

        store.load().await.unwrap();

        assert_eq!(quantities(&store), vec![("1".to_string(), 3)]);
        assert_eq!(
            storage.get(DEFAULT_STORAGE_KEY).await.unwrap().as_deref(),
            Some(blob)
        );
    }

    #[tokio::test]
    async fn test_load_missing_key_is_empty() {
        let store = store();
        store.load().await.unwrap();
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_stays_empty() {
        let storage = MemoryStorage::with_entry(DEFAULT_STORAGE_KEY, "{not json");
        let store = CartStore::new(storage, DEFAULT_STORAGE_KEY);

        let result = store.load().await;
        assert!(matches!(result, Err(CartError::Serialization(_))));
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_load_storage_failure() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let store = CartStore::new(storage, DEFAULT_STORAGE_KEY);

        assert!(matches!(
            store.load().await,
            Err(CartError::Storage(StorageError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let storage = MemoryStorage::new();
        let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
        store.add_to_cart(product("1")).await.unwrap();
        let before = store.products();

        storage.set_failing(true);
        assert!(store.add_to_cart(product("2")).await.is_err());
        assert!(store.increment(&ProductId::new("1")).await.is_err());
        assert!(store.decrement(&ProductId::new("1")).await.is_err());

        assert_eq!(store.products(), before);
    }

    #[tokio::test]
    async fn test_clear_removes_blob() {
        let storage = MemoryStorage::new();
        let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
        store.add_to_cart(product("1")).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.products().is_empty());
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY).await.unwrap(), None);
    }

    // =========================================================================
    // Publishing and concurrency
    // =========================================================================

    #[tokio::test]
    async fn test_subscribers_see_new_snapshots() {
        let store = store();
        let mut rx = store.subscribe();
        let first = rx.borrow_and_update().clone();

        store.add_to_cart(product("1")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let second = rx.borrow_and_update().clone();
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
        // Published snapshots are never mutated after the fact
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(store());
        store.add_to_cart(product("1")).await.unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment(&ProductId::new("1")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(quantities(&store), vec![("1".to_string(), 51)]);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, Price),
        Increment(u8),
        Decrement(u8),
    }

    fn price() -> impl Strategy<Value = Price> {
        (any::<i64>(), 0u32..=28).prop_map(|(mantissa, scale)| Price::new(Decimal::new(mantissa, scale)))
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6, price()).prop_map(|(id, price)| Op::Add(id, price)),
            (0u8..6).prop_map(Op::Increment),
            (0u8..6).prop_map(Op::Decrement),
        ]
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #[test]
        fn prop_distinct_adds_give_one_line_each(ids in proptest::collection::hash_set(0u16..500, 0..20)) {
            let store = store();
            run(async {
                for id in &ids {
                    store.add_to_cart(product(&id.to_string())).await.unwrap();
                }
            });
            prop_assert_eq!(store.products().len(), ids.len());
        }

        #[test]
        fn prop_ids_stay_unique_and_reload_matches(ops in proptest::collection::vec(op(), 0..40)) {
            let storage = MemoryStorage::new();
            let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
            let reloaded = CartStore::new(storage, DEFAULT_STORAGE_KEY);

            run(async {
                for op in &ops {
                    match op {
                        Op::Add(id, price) => {
                            let item = NewCartItem { price: *price, ..product(&id.to_string()) };
                            store.add_to_cart(item).await.unwrap();
                        }
                        Op::Increment(id) => store.increment(&ProductId::new(id.to_string())).await.unwrap(),
                        Op::Decrement(id) => store.decrement(&ProductId::new(id.to_string())).await.unwrap(),
                    }
                }
                reloaded.load().await.unwrap();
            });

            let products = store.products();
            let mut ids: Vec<_> = products.iter().map(|item| item.id.clone()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), products.len());

            let added: std::collections::HashSet<u8> = ops
                .iter()
                .filter_map(|op| match op { Op::Add(id, _) => Some(*id), _ => None })
                .collect();
            prop_assert_eq!(products.len(), added.len());

            prop_assert!(products.iter().all(|item| item.quantity <= 40));
            prop_assert_eq!(reloaded.products(), products);
        }

        #[test]
        fn prop_prices_survive_reload_exactly(prices in proptest::collection::vec(price(), 1..10)) {
            let storage = MemoryStorage::new();
            let store = CartStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
            let reloaded = CartStore::new(storage, DEFAULT_STORAGE_KEY);

            run(async {
                for (id, price) in prices.iter().enumerate() {
                    let item = NewCartItem { price: *price, ..product(&id.to_string()) };
                    store.add_to_cart(item).await.unwrap();
                }
                reloaded.load().await.unwrap();
            });

            let stored: Vec<_> = reloaded.products().iter().map(|item| item.price.amount()).collect();
            let expected: Vec<_> = prices.iter().map(Price::amount).collect();
            prop_assert_eq!(stored, expected);
        }
    }
}
