//! `PostgreSQL` cart store.
//!
//! Rows live in `storefront.cart_item`. Exactly one of `user_id` and
//! `session_id` is set per row, with a partial unique index per owner axis so
//! each owner has at most one line per product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use chatcart_core::{
    CartItem, CartItemId, CartOwner, CategoryId, Product, ProductId, SessionKey, UserId,
};

use super::RepositoryError;
use super::products::ProductRow;
use crate::cart::{CartError, CartStore};

/// Cart line joined with its product. Product columns are `NULL` when the
/// join does not resolve.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    product_id: ProductId,
    quantity: i32,
    p_id: Option<ProductId>,
    p_name: Option<String>,
    p_slug: Option<String>,
    p_image_url: Option<String>,
    p_category_id: Option<CategoryId>,
    p_price: Option<Decimal>,
    p_currency: Option<String>,
    p_stock: Option<i32>,
    p_sale_price: Option<Decimal>,
    p_sale_start_date: Option<DateTime<Utc>>,
    p_sale_end_date: Option<DateTime<Utc>>,
    p_is_on_sale: Option<bool>,
}

impl CartItemRow {
    fn product_row(&mut self) -> Option<ProductRow> {
        Some(ProductRow {
            id: self.p_id?,
            name: self.p_name.take()?,
            slug: self.p_slug.take()?,
            image_url: self.p_image_url.take(),
            category_id: self.p_category_id,
            price: self.p_price?,
            currency: self.p_currency.take()?,
            stock: self.p_stock?,
            sale_price: self.p_sale_price,
            sale_start_date: self.p_sale_start_date,
            sale_end_date: self.p_sale_end_date,
            is_on_sale: self.p_is_on_sale?,
        })
    }
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(mut row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "cart item {} has quantity {}",
                row.id, row.quantity
            ))
        })?;

        // A product that no longer converts cleanly is reported as unresolved
        // rather than failing the whole cart.
        let product = row
            .product_row()
            .and_then(|product| match Product::try_from(product) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(cart_item = %row.id, error = %e, "unresolvable cart product");
                    None
                }
            });

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            quantity,
            product,
        })
    }
}

/// [`CartStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Owner columns bound as `(user_id, session_id)`.
const fn owner_columns(owner: &CartOwner) -> (Option<UserId>, Option<SessionKey>) {
    (owner.user_id(), owner.session_key())
}

fn quantity_to_i32(quantity: i64) -> Result<i32, CartError> {
    i32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))
}

impl CartStore for PgCartStore {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn fetch_cart_items(&self, owner: &CartOwner) -> Result<Vec<CartItem>, CartError> {
        let (user_id, session_id) = owner_columns(owner);

        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT ci.id, ci.product_id, ci.quantity,
                   p.id AS p_id, p.name AS p_name, p.slug AS p_slug,
                   p.image_url AS p_image_url, p.category_id AS p_category_id,
                   p.price AS p_price, p.currency AS p_currency, p.stock AS p_stock,
                   p.sale_price AS p_sale_price, p.sale_start_date AS p_sale_start_date,
                   p.sale_end_date AS p_sale_end_date, p.is_on_sale AS p_is_on_sale
            FROM storefront.cart_item ci
            LEFT JOIN storefront.product p ON p.id = ci.product_id
            WHERE ci.user_id IS NOT DISTINCT FROM $1
              AND ci.session_id IS NOT DISTINCT FROM $2
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let items = rows
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn upsert_cart_item(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity_delta: u32,
    ) -> Result<(), CartError> {
        let delta = quantity_to_i32(i64::from(quantity_delta))?;

        // ON CONFLICT must name the partial index predicate of the owner axis.
        let query = match owner {
            CartOwner::User(user_id) => sqlx::query(
                r"
                INSERT INTO storefront.cart_item (user_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
                DO UPDATE SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                              updated_at = NOW()
                ",
            )
            .bind(*user_id),
            CartOwner::Anonymous(session_id) => sqlx::query(
                r"
                INSERT INTO storefront.cart_item (session_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (session_id, product_id) WHERE session_id IS NOT NULL
                DO UPDATE SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                              updated_at = NOW()
                ",
            )
            .bind(*session_id),
        };

        query
            .bind(product_id)
            .bind(delta)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return CartError::ProductNotFound(product_id);
                }
                CartError::Repository(RepositoryError::Database(e))
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn update_cart_item_quantity(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.delete_cart_item(owner, item_id).await;
        }
        let quantity = quantity_to_i32(quantity)?;
        let (user_id, session_id) = owner_columns(owner);

        let result = sqlx::query(
            r"
            UPDATE storefront.cart_item
            SET quantity = $1, updated_at = NOW()
            WHERE id = $2
              AND user_id IS NOT DISTINCT FROM $3
              AND session_id IS NOT DISTINCT FROM $4
            ",
        )
        .bind(quantity)
        .bind(item_id)
        .bind(user_id)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(CartError::ItemNotFound(item_id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn delete_cart_item(&self, owner: &CartOwner, item_id: CartItemId) -> Result<(), CartError> {
        let (user_id, session_id) = owner_columns(owner);

        sqlx::query(
            r"
            DELETE FROM storefront.cart_item
            WHERE id = $1
              AND user_id IS NOT DISTINCT FROM $2
              AND session_id IS NOT DISTINCT FROM $3
            ",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn delete_all_cart_items(&self, owner: &CartOwner) -> Result<(), CartError> {
        let (user_id, session_id) = owner_columns(owner);

        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_item
            WHERE user_id IS NOT DISTINCT FROM $1
              AND session_id IS NOT DISTINCT FROM $2
            ",
        )
        .bind(user_id)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        tracing::debug!(deleted = result.rows_affected(), "cleared cart");
        Ok(())
    }
}
