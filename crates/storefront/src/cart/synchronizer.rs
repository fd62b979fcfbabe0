//! Optimistic cart state with refetch reconciliation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chatcart_core::{
    CartItem, CartItemId, CartOwner, CurrencyTotals, ProductId, calculate_cart_totals_by_currency,
};
use tracing::instrument;

use super::{CartError, CartStore};

#[derive(Default)]
struct CartState {
    items: Vec<CartItem>,
    /// In-flight mutations per line, for per-row busy indicators.
    pending_items: HashMap<CartItemId, usize>,
    /// In-flight adds per product.
    pending_adds: HashMap<ProductId, usize>,
}

/// Local copy of one owner's cart, kept in step with a [`CartStore`].
///
/// Methods take `&self` and may run concurrently. Calls are not queued
/// against each other: when two mutations on the same line overlap, whichever
/// refetch finishes last decides the local state.
pub struct CartSynchronizer<S> {
    store: S,
    owner: CartOwner,
    state: Mutex<CartState>,
}

impl<S: CartStore> CartSynchronizer<S> {
    /// Create an empty synchronizer. Call [`Self::refresh_cart`] to populate it.
    pub fn new(store: S, owner: CartOwner) -> Self {
        Self {
            store,
            owner,
            state: Mutex::new(CartState::default()),
        }
    }

    /// Create a synchronizer and load the owner's current cart.
    ///
    /// # Errors
    ///
    /// Returns the store error if the initial fetch fails.
    pub async fn load(store: S, owner: CartOwner) -> Result<Self, CartError> {
        let cart = Self::new(store, owner);
        cart.refresh_cart().await?;
        Ok(cart)
    }

    #[must_use]
    pub const fn owner(&self) -> CartOwner {
        self.owner
    }

    /// Snapshot of the current lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.state().items.clone()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.state()
            .items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Per-currency totals at effective prices.
    #[must_use]
    pub fn totals_by_currency(&self) -> CurrencyTotals {
        calculate_cart_totals_by_currency(&self.state().items)
    }

    /// Whether a mutation on this line is in flight.
    #[must_use]
    pub fn is_pending(&self, item_id: CartItemId) -> bool {
        self.state().pending_items.contains_key(&item_id)
    }

    /// Whether an add for this product is in flight.
    #[must_use]
    pub fn is_adding(&self, product_id: ProductId) -> bool {
        self.state().pending_adds.contains_key(&product_id)
    }

    /// Replace the local lines with the store's current lines.
    ///
    /// # Errors
    ///
    /// Returns the store error; the local lines are left untouched.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn refresh_cart(&self) -> Result<(), CartError> {
        let items = self.store.fetch_cart_items(&self.owner).await?;
        tracing::debug!(lines = items.len(), "cart refreshed");
        self.state().items = items;
        Ok(())
    }

    /// Add units of a product. A quantity of 0 adds one unit.
    ///
    /// No local patch is applied: the store decides whether this merges into
    /// an existing line, and the refetch shows the result.
    ///
    /// # Errors
    ///
    /// Returns the store error after the refetch has run.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let quantity = quantity.max(1);
        let _adding = Pending::begin(&self.state, pending_adds, product_id);

        let result = self
            .store
            .upsert_cart_item(&self.owner, product_id, quantity)
            .await;
        self.reconcile("add_item", result).await
    }

    /// Set a line's quantity. `new_quantity <= 0` removes the line.
    ///
    /// # Errors
    ///
    /// Returns the store error after the refetch has run.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn update_quantity(
        &self,
        item_id: CartItemId,
        new_quantity: i64,
    ) -> Result<(), CartError> {
        if new_quantity <= 0 {
            return self.remove_item(item_id).await;
        }

        {
            let mut state = self.state();
            // Larger than any storable quantity: let the store reject it.
            let patched = u32::try_from(new_quantity).unwrap_or(u32::MAX);
            if let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) {
                item.quantity = patched;
            }
        }
        let _pending = Pending::begin(&self.state, pending_items, item_id);

        let result = self
            .store
            .update_cart_item_quantity(&self.owner, item_id, new_quantity)
            .await;
        self.reconcile("update_quantity", result).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the store error after the refetch has run.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<(), CartError> {
        self.state().items.retain(|item| item.id != item_id);
        let _pending = Pending::begin(&self.state, pending_items, item_id);

        let result = self.store.delete_cart_item(&self.owner, item_id).await;
        self.reconcile("remove_item", result).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns the store error after the refetch has run.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        self.state().items.clear();

        let result = self.store.delete_all_cart_items(&self.owner).await;
        self.reconcile("clear_cart", result).await
    }

    /// Refetch after a store call and pick the error to report.
    ///
    /// The store call's own error wins over a refetch error.
    async fn reconcile(
        &self,
        operation: &'static str,
        result: Result<(), CartError>,
    ) -> Result<(), CartError> {
        let refreshed = self.refresh_cart().await;

        match (result, refreshed) {
            (Ok(()), refreshed) => refreshed,
            (Err(err), Ok(())) => {
                tracing::error!(operation, error = %err, "cart mutation failed, state refetched");
                Err(err)
            }
            (Err(err), Err(refetch_err)) => {
                tracing::error!(
                    operation,
                    error = %err,
                    refetch_error = %refetch_err,
                    "cart mutation failed and refetch failed"
                );
                Err(err)
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<CartState>) -> MutexGuard<'_, CartState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn pending_items(state: &mut CartState) -> &mut HashMap<CartItemId, usize> {
    &mut state.pending_items
}

fn pending_adds(state: &mut CartState) -> &mut HashMap<ProductId, usize> {
    &mut state.pending_adds
}

/// Marks a key as in flight until dropped.
///
/// Releasing on drop keeps the counts right when the caller abandons the
/// future mid-call.
struct Pending<'a, K: Copy + Eq + Hash> {
    state: &'a Mutex<CartState>,
    counts: fn(&mut CartState) -> &mut HashMap<K, usize>,
    key: K,
}

impl<'a, K: Copy + Eq + Hash> Pending<'a, K> {
    fn begin(
        state: &'a Mutex<CartState>,
        counts: fn(&mut CartState) -> &mut HashMap<K, usize>,
        key: K,
    ) -> Self {
        increment(counts(&mut lock(state)), key);
        Self { state, counts, key }
    }
}

impl<K: Copy + Eq + Hash> Drop for Pending<'_, K> {
    fn drop(&mut self) {
        decrement((self.counts)(&mut lock(self.state)), &self.key);
    }
}

fn increment<K: Eq + Hash>(counts: &mut HashMap<K, usize>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

fn decrement<K: Eq + Hash>(counts: &mut HashMap<K, usize>, key: &K) {
    if let Some(count) = counts.get_mut(key) {
        *count -= 1;
        if *count == 0 {
            counts.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatcart_core::{CurrencyCode, Product, SessionKey};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    /// Store that serves a fixed list, records calls and fails on demand.
    #[derive(Default)]
    struct ScriptedStore {
        items: Mutex<Vec<CartItem>>,
        calls: Mutex<Vec<String>>,
        fail_mutations: bool,
        fail_fetch: bool,
        /// Mutations never complete.
        stall_mutations: bool,
    }

    impl ScriptedStore {
        fn with_items(items: Vec<CartItem>) -> Self {
            Self {
                items: Mutex::new(items),
                ..Self::default()
            }
        }

        async fn record(&self, call: String) -> Result<(), CartError> {
            self.calls.lock().unwrap().push(call);
            if self.stall_mutations {
                std::future::pending::<()>().await;
            }
            if self.fail_mutations {
                Err(CartError::Unavailable("scripted failure".to_owned()))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CartStore for ScriptedStore {
        async fn fetch_cart_items(&self, _owner: &CartOwner) -> Result<Vec<CartItem>, CartError> {
            self.calls.lock().unwrap().push("fetch".to_owned());
            if self.fail_fetch {
                return Err(CartError::Unavailable("fetch failed".to_owned()));
            }
            Ok(self.items.lock().unwrap().clone())
        }

        async fn upsert_cart_item(
            &self,
            _owner: &CartOwner,
            _product_id: ProductId,
            quantity_delta: u32,
        ) -> Result<(), CartError> {
            self.record(format!("upsert {quantity_delta}")).await
        }

        async fn update_cart_item_quantity(
            &self,
            _owner: &CartOwner,
            _item_id: CartItemId,
            quantity: i64,
        ) -> Result<(), CartError> {
            self.record(format!("update {quantity}")).await
        }

        async fn delete_cart_item(
            &self,
            _owner: &CartOwner,
            _item_id: CartItemId,
        ) -> Result<(), CartError> {
            self.record("delete".to_owned()).await
        }

        async fn delete_all_cart_items(&self, _owner: &CartOwner) -> Result<(), CartError> {
            self.record("delete_all".to_owned()).await
        }
    }

    fn owner() -> CartOwner {
        CartOwner::Anonymous(SessionKey::new(Uuid::from_u128(1)))
    }

    fn line(n: u128, price: i64, currency: &str, quantity: u32) -> CartItem {
        let product_id = ProductId::new(Uuid::from_u128(1000 + n));
        CartItem {
            id: CartItemId::new(Uuid::from_u128(n)),
            product_id,
            quantity,
            product: Some(Product {
                id: product_id,
                name: format!("Producto {n}"),
                slug: format!("producto-{n}"),
                image_url: None,
                category_id: None,
                price: Decimal::from(price),
                currency: CurrencyCode::parse(currency).unwrap(),
                stock: 10,
                sale_price: None,
                sale_start_date: None,
                sale_end_date: None,
                is_on_sale: false,
            }),
        }
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    #[tokio::test]
    async fn test_load_populates_items_and_totals() {
        let store = ScriptedStore::with_items(vec![line(1, 10, "USD", 2), line(2, 5, "EUR", 3)]);
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 5);
        let totals = cart.totals_by_currency();
        assert_eq!(
            totals.get(&CurrencyCode::usd()),
            Some(Decimal::from(20))
        );
        assert_eq!(
            totals.get(&CurrencyCode::parse("EUR").unwrap()),
            Some(Decimal::from(15))
        );
    }

    // =========================================================================
    // Protocol ordering
    // =========================================================================

    #[tokio::test]
    async fn test_add_item_persists_then_refetches() {
        let cart = CartSynchronizer::new(ScriptedStore::default(), owner());
        cart.add_item(ProductId::new(Uuid::from_u128(9)), 0)
            .await
            .unwrap();

        assert_eq!(cart.store.calls(), ["upsert 1", "fetch"]);
        assert!(!cart.is_adding(ProductId::new(Uuid::from_u128(9))));
    }

    #[tokio::test]
    async fn test_update_persists_then_refetches() {
        let store = ScriptedStore::with_items(vec![line(1, 10, "USD", 2)]);
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();

        cart.update_quantity(CartItemId::new(Uuid::from_u128(1)), 7)
            .await
            .unwrap();

        assert_eq!(cart.store.calls(), ["fetch", "update 7", "fetch"]);
        // The refetch wins: the scripted store never changed its quantity.
        assert_eq!(cart.items()[0].quantity, 2);
        assert!(!cart.is_pending(CartItemId::new(Uuid::from_u128(1))));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let store = ScriptedStore::with_items(vec![line(1, 10, "USD", 2)]);
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();

        cart.update_quantity(CartItemId::new(Uuid::from_u128(1)), 0)
            .await
            .unwrap();
        cart.update_quantity(CartItemId::new(Uuid::from_u128(1)), -3)
            .await
            .unwrap();

        assert_eq!(
            cart.store.calls(),
            ["fetch", "delete", "fetch", "delete", "fetch"]
        );
    }

    #[tokio::test]
    async fn test_clear_cart_calls_delete_all() {
        let store = ScriptedStore::with_items(vec![line(1, 10, "USD", 2)]);
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();

        cart.clear_cart().await.unwrap();

        assert_eq!(cart.store.calls(), ["fetch", "delete_all", "fetch"]);
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    #[tokio::test]
    async fn test_failed_remove_refetches_and_propagates() {
        let store = ScriptedStore {
            fail_mutations: true,
            ..ScriptedStore::with_items(vec![line(1, 10, "USD", 2)])
        };
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();

        let err = cart
            .remove_item(CartItemId::new(Uuid::from_u128(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Unavailable(_)));
        // Optimistic removal was undone by the refetch.
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.store.calls(), ["fetch", "delete", "fetch"]);
        assert!(!cart.is_pending(CartItemId::new(Uuid::from_u128(1))));
    }

    #[tokio::test]
    async fn test_mutation_error_wins_over_refetch_error() {
        let store = ScriptedStore {
            fail_mutations: true,
            fail_fetch: true,
            ..ScriptedStore::default()
        };
        let cart = CartSynchronizer::new(store, owner());

        let err = cart.clear_cart().await.unwrap_err();
        assert!(matches!(err, CartError::Unavailable(msg) if msg == "scripted failure"));
    }

    #[tokio::test]
    async fn test_refetch_error_reported_when_mutation_succeeds() {
        let store = ScriptedStore {
            fail_fetch: true,
            ..ScriptedStore::default()
        };
        let cart = CartSynchronizer::new(store, owner());

        let err = cart
            .add_item(ProductId::new(Uuid::from_u128(3)), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Unavailable(msg) if msg == "fetch failed"));
    }

    // =========================================================================
    // Busy indicators
    // =========================================================================

    #[tokio::test]
    async fn test_abandoned_update_clears_pending() {
        let store = ScriptedStore {
            stall_mutations: true,
            ..ScriptedStore::with_items(vec![line(1, 10, "USD", 2)])
        };
        let cart = CartSynchronizer::load(store, owner()).await.unwrap();
        let item_id = CartItemId::new(Uuid::from_u128(1));

        {
            let mut update = std::pin::pin!(cart.update_quantity(item_id, 5));
            let outcome = tokio::time::timeout(Duration::from_millis(20), update.as_mut()).await;
            assert!(outcome.is_err());
            assert!(cart.is_pending(item_id));
        }

        assert!(!cart.is_pending(item_id));
    }

    #[tokio::test]
    async fn test_abandoned_add_clears_adding() {
        let store = ScriptedStore {
            stall_mutations: true,
            ..ScriptedStore::default()
        };
        let cart = CartSynchronizer::new(store, owner());
        let product_id = ProductId::new(Uuid::from_u128(9));

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), cart.add_item(product_id, 1)).await;

        assert!(outcome.is_err());
        assert!(!cart.is_adding(product_id));
    }

    #[test]
    fn test_pending_counts() {
        let mut counts = HashMap::new();
        increment(&mut counts, 1);
        increment(&mut counts, 1);
        decrement(&mut counts, &1);
        assert!(counts.contains_key(&1));
        decrement(&mut counts, &1);
        assert!(!counts.contains_key(&1));
        decrement(&mut counts, &1);
        assert!(counts.is_empty());
    }
}
