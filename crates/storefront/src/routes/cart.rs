//! Cart route handlers.
//!
//! Each request builds a [`CartSynchronizer`] for the visitor. Mutations
//! persist, refetch and answer with the refetched cart.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use chatcart_core::{
    CartItem, CartItemId, CurrencyCode, Price, ProductId, calculate_line_total,
    get_effective_price, get_sorted_currency_entries, has_multiple_currencies,
};

use crate::cart::{CartStore, CartSynchronizer};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::CurrentOwner;
use crate::state::AppState;

/// One cart line for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// `None` when the product did not resolve.
    pub product: Option<CartProductView>,
}

/// Product details shown on a cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartProductView {
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price: String,
    pub line_total: String,
}

/// Total for one currency.
#[derive(Debug, Clone, Serialize)]
pub struct CurrencyTotalView {
    pub currency: CurrencyCode,
    pub amount: Decimal,
    pub display: String,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    /// USD first, then by currency code.
    pub totals: Vec<CurrencyTotalView>,
    pub has_multiple_currencies: bool,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let product = item.product.as_ref().map(|product| {
            let unit = get_effective_price(product);
            CartProductView {
                name: product.name.clone(),
                slug: product.slug.clone(),
                image_url: product.image_url.clone(),
                unit_price: Price::new(unit, product.currency.clone()).display(),
                line_total: Price::new(
                    calculate_line_total(unit, item.quantity),
                    product.currency.clone(),
                )
                .display(),
            }
        });

        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            product,
        }
    }
}

impl CartView {
    /// Build the view from a synchronizer's current state.
    #[must_use]
    pub fn from_cart<S: CartStore>(cart: &CartSynchronizer<S>) -> Self {
        let items = cart.items();
        let totals = cart.totals_by_currency();

        Self {
            items: items.iter().map(CartItemView::from).collect(),
            item_count: cart.item_count(),
            totals: get_sorted_currency_entries(&totals)
                .into_iter()
                .map(|(currency, amount)| CurrencyTotalView {
                    display: Price::new(amount, currency.clone()).display(),
                    currency,
                    amount,
                })
                .collect(),
            has_multiple_currencies: has_multiple_currencies(&totals),
        }
    }
}

/// Request body for adding to the cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    /// Defaults to 1.
    pub quantity: Option<u32>,
}

/// Request body for changing a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    /// Zero or less removes the line.
    pub quantity: i64,
}

/// Show the cart.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn show(State(state): State<AppState>, visitor: CurrentOwner) -> Result<Json<CartView>> {
    let cart = CartSynchronizer::load(state.cart_store(), visitor.owner).await?;
    Ok(Json(CartView::from_cart(&cart)))
}

/// Add a product to the cart.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn add_item(
    State(state): State<AppState>,
    visitor: CurrentOwner,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let quantity = request.quantity.unwrap_or(1);
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", request.product_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );

    let cart = CartSynchronizer::new(state.cart_store(), visitor.owner);
    cart.add_item(request.product_id, quantity).await?;
    Ok(Json(CartView::from_cart(&cart)))
}

/// Change a line's quantity.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn update_item(
    State(state): State<AppState>,
    visitor: CurrentOwner,
    Path(item_id): Path<CartItemId>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let cart = CartSynchronizer::new(state.cart_store(), visitor.owner);
    cart.update_quantity(item_id, request.quantity).await?;
    Ok(Json(CartView::from_cart(&cart)))
}

/// Remove a line.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn remove_item(
    State(state): State<AppState>,
    visitor: CurrentOwner,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let cart = CartSynchronizer::new(state.cart_store(), visitor.owner);
    cart.remove_item(item_id).await?;
    Ok(Json(CartView::from_cart(&cart)))
}

/// Empty the cart.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn clear(State(state): State<AppState>, visitor: CurrentOwner) -> Result<Json<CartView>> {
    add_breadcrumb("cart", "Cleared cart", &[]);

    let cart = CartSynchronizer::new(state.cart_store(), visitor.owner);
    cart.clear_cart().await?;
    Ok(Json(CartView::from_cart(&cart)))
}

#[cfg(test)]
mod tests {
    use chatcart_core::{CartOwner, Product, SessionKey};
    use uuid::Uuid;

    use super::*;
    use crate::cart::CartError;

    /// Store that always returns the same lines and accepts every write.
    struct FixedStore(Vec<CartItem>);

    impl CartStore for FixedStore {
        async fn fetch_cart_items(&self, _owner: &CartOwner) -> std::result::Result<Vec<CartItem>, CartError> {
            Ok(self.0.clone())
        }

        async fn upsert_cart_item(
            &self,
            _owner: &CartOwner,
            _product_id: ProductId,
            _quantity_delta: u32,
        ) -> std::result::Result<(), CartError> {
            Ok(())
        }

        async fn update_cart_item_quantity(
            &self,
            _owner: &CartOwner,
            _item_id: CartItemId,
            _quantity: i64,
        ) -> std::result::Result<(), CartError> {
            Ok(())
        }

        async fn delete_cart_item(
            &self,
            _owner: &CartOwner,
            _item_id: CartItemId,
        ) -> std::result::Result<(), CartError> {
            Ok(())
        }

        async fn delete_all_cart_items(&self, _owner: &CartOwner) -> std::result::Result<(), CartError> {
            Ok(())
        }
    }

    fn product(price: Decimal, currency: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Guayabera".to_owned(),
            slug: "guayabera".to_owned(),
            image_url: None,
            category_id: None,
            price,
            currency: CurrencyCode::parse(currency).unwrap(),
            stock: 10,
            sale_price: None,
            sale_start_date: None,
            sale_end_date: None,
            is_on_sale: false,
        }
    }

    fn item(n: u128, quantity: u32, product: Option<Product>) -> CartItem {
        CartItem {
            id: CartItemId::new(Uuid::from_u128(n)),
            product_id: ProductId::new(Uuid::from_u128(n)),
            quantity,
            product,
        }
    }

    #[tokio::test]
    async fn test_cart_view_orders_totals_usd_first() {
        let store = FixedStore(vec![
            item(1, 2, Some(product(Decimal::new(10, 0), "EUR"))),
            item(2, 1, Some(product(Decimal::new(5, 0), "USD"))),
            item(3, 4, None),
        ]);
        let owner = CartOwner::Anonymous(SessionKey::new(Uuid::from_u128(9)));
        let cart = CartSynchronizer::load(store, owner).await.unwrap();

        let view = CartView::from_cart(&cart);
        assert_eq!(view.item_count, 7);
        assert!(view.has_multiple_currencies);

        let displays: Vec<_> = view.totals.iter().map(|t| t.display.as_str()).collect();
        assert_eq!(displays, vec!["$5.00", "€20.00"]);

        assert!(view.items[2].product.is_none());
        let first = view.items[0].product.as_ref().unwrap();
        assert_eq!(first.unit_price, "€10.00");
        assert_eq!(first.line_total, "€20.00");
    }
}
