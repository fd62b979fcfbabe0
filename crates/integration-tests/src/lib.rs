//! Integration test fixtures for Chatcart.
//!
//! In-memory collaborators that behave like the `PostgreSQL` cart store and
//! the session-backed favorites storage, with switches for injecting
//! failures and pausing mutations mid-flight.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p chatcart-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Notify;
use uuid::Uuid;

use chatcart_core::{CartItem, CartItemId, CartOwner, CurrencyCode, Product, ProductId, SessionKey};
use chatcart_storefront::cart::{CartError, CartStore};
use chatcart_storefront::favorites::{KeyValueStorage, MemoryStorage, StorageError};

// =============================================================================
// Products
// =============================================================================

/// Builder for catalog products.
///
/// ```rust
/// use chatcart_integration_tests::ProductBuilder;
///
/// let coffee = ProductBuilder::new("Coffee").price("3.50").stock(10).build();
/// assert_eq!(coffee.currency.as_str(), "USD");
/// ```
#[derive(Debug, Clone)]
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    /// A USD product priced at zero with no stock and no sale.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            product: Product {
                id: ProductId::generate(),
                name: name.to_owned(),
                slug: name.to_lowercase().replace(' ', "-"),
                image_url: None,
                category_id: None,
                price: Decimal::ZERO,
                currency: CurrencyCode::usd(),
                stock: 0,
                sale_price: None,
                sale_start_date: None,
                sale_end_date: None,
                is_on_sale: false,
            },
        }
    }

    #[must_use]
    pub const fn id(mut self, id: ProductId) -> Self {
        self.product.id = id;
        self
    }

    /// # Panics
    ///
    /// Panics if `price` is not a decimal number.
    #[must_use]
    pub fn price(mut self, price: &str) -> Self {
        self.product.price = dec(price);
        self
    }

    /// # Panics
    ///
    /// Panics if `currency` is not a valid code.
    #[must_use]
    pub fn currency(mut self, currency: &str) -> Self {
        self.product.currency = CurrencyCode::parse(currency).expect("valid currency code");
        self
    }

    #[must_use]
    pub const fn stock(mut self, stock: i32) -> Self {
        self.product.stock = stock;
        self
    }

    /// Configure a sale window. The sale flag is left as is.
    ///
    /// # Panics
    ///
    /// Panics if `sale_price` is not a decimal number.
    #[must_use]
    pub fn sale(mut self, sale_price: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.product.sale_price = Some(dec(sale_price));
        self.product.sale_start_date = Some(start);
        self.product.sale_end_date = Some(end);
        self
    }

    #[must_use]
    pub const fn on_sale(mut self, is_on_sale: bool) -> Self {
        self.product.is_on_sale = is_on_sale;
        self
    }

    #[must_use]
    pub fn build(self) -> Product {
        self.product
    }
}

/// Parse a decimal literal.
///
/// # Panics
///
/// Panics if `s` is not a decimal number.
#[must_use]
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

/// A fresh anonymous cart owner.
#[must_use]
pub fn anonymous_owner() -> CartOwner {
    CartOwner::Anonymous(SessionKey::generate())
}

// =============================================================================
// Cart Store
// =============================================================================

/// Pauses store mutations until released.
///
/// A paused mutation signals `entered` and then waits for `release`, which
/// lets a test observe the synchronizer between its local patch and the
/// store call completing.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until a mutation is paused at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one paused mutation continue.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Debug, Clone)]
struct StoredRow {
    id: CartItemId,
    owner: CartOwner,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Default)]
struct Inner {
    catalog: Mutex<HashMap<ProductId, Product>>,
    rows: Mutex<Vec<StoredRow>>,
    gate: Mutex<Option<Arc<Gate>>>,
    fail_mutations: AtomicBool,
    fail_fetch: AtomicBool,
    mutations: AtomicUsize,
    fetches: AtomicUsize,
}

/// In-memory [`CartStore`] mirroring the `PostgreSQL` store's rules.
///
/// Lines are unique per (owner, product), adds merge quantities, and
/// item operations only see the caller's own lines. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `product` resolvable and addable.
    pub fn add_product(&self, product: Product) {
        lock(&self.inner.catalog).insert(product.id, product);
    }

    /// Drop a product from the catalog, leaving cart lines that point at it.
    pub fn remove_product(&self, id: ProductId) {
        lock(&self.inner.catalog).remove(&id);
    }

    /// Insert a line directly, bypassing the catalog check.
    pub fn seed_item(&self, owner: CartOwner, product_id: ProductId, quantity: u32) -> CartItemId {
        let id = CartItemId::new(Uuid::new_v4());
        lock(&self.inner.rows).push(StoredRow {
            id,
            owner,
            product_id,
            quantity,
        });
        id
    }

    /// Make every mutation fail with `CartError::Unavailable`.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.inner.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Make every fetch fail with `CartError::Unavailable`.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.inner.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Pause every mutation at `gate` until released.
    pub fn set_gate(&self, gate: Option<Arc<Gate>>) {
        *lock(&self.inner.gate) = gate;
    }

    /// Mutation calls so far, failed ones included.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.inner.mutations.load(Ordering::SeqCst)
    }

    /// Fetch calls so far, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Stored quantity of a line, ignoring ownership.
    #[must_use]
    pub fn stored_quantity(&self, id: CartItemId) -> Option<u32> {
        lock(&self.inner.rows)
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.quantity)
    }

    async fn begin_mutation(&self) -> Result<(), CartError> {
        self.inner.mutations.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.inner.gate).clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.inner.fail_mutations.load(Ordering::SeqCst) {
            return Err(CartError::Unavailable("injected mutation failure".to_owned()));
        }
        Ok(())
    }
}

impl CartStore for InMemoryCartStore {
    async fn fetch_cart_items(&self, owner: &CartOwner) -> Result<Vec<CartItem>, CartError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_fetch.load(Ordering::SeqCst) {
            return Err(CartError::Unavailable("injected fetch failure".to_owned()));
        }

        let catalog = lock(&self.inner.catalog);
        let items = lock(&self.inner.rows)
            .iter()
            .filter(|row| row.owner == *owner)
            .map(|row| CartItem {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
                product: catalog.get(&row.product_id).cloned(),
            })
            .collect();
        Ok(items)
    }

    async fn upsert_cart_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity_delta: u32,
    ) -> Result<(), CartError> {
        self.begin_mutation().await?;

        if !lock(&self.inner.catalog).contains_key(&product_id) {
            return Err(CartError::ProductNotFound(product_id));
        }

        let mut rows = lock(&self.inner.rows);
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.owner == *owner && row.product_id == product_id)
        {
            row.quantity = row.quantity.saturating_add(quantity_delta);
        } else {
            rows.push(StoredRow {
                id: CartItemId::new(Uuid::new_v4()),
                owner: *owner,
                product_id,
                quantity: quantity_delta,
            });
        }
        Ok(())
    }

    async fn update_cart_item_quantity(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CartError> {
        self.begin_mutation().await?;

        let mut rows = lock(&self.inner.rows);
        if quantity <= 0 {
            rows.retain(|row| !(row.id == item_id && row.owner == *owner));
            return Ok(());
        }
        let quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;

        let row = rows
            .iter_mut()
            .find(|row| row.id == item_id && row.owner == *owner)
            .ok_or(CartError::ItemNotFound(item_id))?;
        row.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_item(&self, owner: &CartOwner, item_id: CartItemId) -> Result<(), CartError> {
        self.begin_mutation().await?;
        lock(&self.inner.rows).retain(|row| !(row.id == item_id && row.owner == *owner));
        Ok(())
    }

    async fn delete_all_cart_items(&self, owner: &CartOwner) -> Result<(), CartError> {
        self.begin_mutation().await?;
        lock(&self.inner.rows).retain(|row| row.owner != *owner);
        Ok(())
    }
}

// =============================================================================
// Favorites Storage
// =============================================================================

/// [`MemoryStorage`] whose reads and writes can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyStorage {
    storage: MemoryStorage,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStorage {
    #[must_use]
    pub fn new(storage: MemoryStorage) -> Self {
        Self {
            storage,
            ..Self::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value for `key` in the underlying storage.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }
}

impl KeyValueStorage for FlakyStorage {
    async fn read_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected read failure".to_owned()));
        }
        self.storage.read_string(key).await
    }

    async fn write_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected write failure".to_owned()));
        }
        self.storage.write_string(key, value).await
    }
}
