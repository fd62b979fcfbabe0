//! Persistence interface the cart synchronizer talks to.

use std::future::Future;

use chatcart_core::{CartItem, CartItemId, CartOwner, ProductId};
use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from cart persistence and cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The backing repository failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The cart line does not exist for this owner.
    #[error("cart item not found: {0}")]
    ItemNotFound(CartItemId),

    /// The product being added does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The requested quantity cannot be stored.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The store could not be reached.
    #[error("cart store unavailable: {0}")]
    Unavailable(String),
}

/// Record store for cart lines.
///
/// Every operation is scoped to a [`CartOwner`]; item-level operations on a
/// line owned by someone else behave as if the line did not exist.
pub trait CartStore: Send + Sync {
    /// All lines for `owner`, each with its product resolved when possible.
    fn fetch_cart_items(
        &self,
        owner: &CartOwner,
    ) -> impl Future<Output = Result<Vec<CartItem>, CartError>> + Send;

    /// Add `quantity_delta` units of a product, merging into the existing
    /// line for (owner, product) if there is one.
    fn upsert_cart_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity_delta: u32,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Set a line's quantity. `quantity <= 0` deletes the line.
    fn update_cart_item_quantity(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
        quantity: i64,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Delete one line. Deleting a missing line is not an error.
    fn delete_cart_item(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Delete every line for `owner`.
    fn delete_all_cart_items(
        &self,
        owner: &CartOwner,
    ) -> impl Future<Output = Result<(), CartError>> + Send;
}
