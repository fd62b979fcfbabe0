//! Product catalog repository.
//!
//! Uses runtime queries with [`sqlx::FromRow`] row types. Every write path
//! validates the product first, so an invalid sale configuration never
//! reaches the table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use chatcart_core::{CategoryId, CurrencyCode, Product, ProductId};

use super::RepositoryError;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `storefront.product` queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Decimal,
    pub currency: String,
    pub stock: i32,
    pub sale_price: Option<Decimal>,
    pub sale_start_date: Option<DateTime<Utc>>,
    pub sale_end_date: Option<DateTime<Utc>>,
    pub is_on_sale: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid currency for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            image_url: row.image_url,
            category_id: row.category_id,
            price: row.price,
            currency,
            stock: row.stock,
            sale_price: row.sale_price,
            sale_start_date: row.sale_start_date,
            sale_end_date: row.sale_end_date,
            is_on_sale: row.is_on_sale,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, slug, image_url, category_id, price, currency, stock, \
     sale_price, sale_start_date, sale_end_date, is_on_sale";

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads and writes.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored currency is invalid.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product ORDER BY name, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// List products in the category with `category_slug`, ordered by name.
    ///
    /// An unknown slug gives an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category_slug: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product \
             WHERE category_id = (SELECT id FROM storefront.category WHERE slug = $1) \
             ORDER BY name, id"
        ))
        .bind(category_slug)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a product, or update the existing one with the same slug.
    ///
    /// The stored row keeps its original ID on update. Returns the product as
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the product fails validation.
    /// Returns `RepositoryError::Conflict` if a constraint rejects the row.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, product), fields(slug = %product.slug))]
    pub async fn upsert(&self, product: &Product) -> Result<Product, RepositoryError> {
        product.validate()?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (id, name, slug, image_url, category_id, price, currency, stock,
                 sale_price, sale_start_date, sale_end_date, is_on_sale)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                image_url = EXCLUDED.image_url,
                category_id = EXCLUDED.category_id,
                price = EXCLUDED.price,
                currency = EXCLUDED.currency,
                stock = EXCLUDED.stock,
                sale_price = EXCLUDED.sale_price,
                sale_start_date = EXCLUDED.sale_start_date,
                sale_end_date = EXCLUDED.sale_end_date,
                is_on_sale = EXCLUDED.is_on_sale,
                updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.image_url.as_deref())
        .bind(product.category_id)
        .bind(product.price)
        .bind(product.currency.as_str())
        .bind(product.stock)
        .bind(product.sale_price)
        .bind(product.sale_start_date)
        .bind(product.sale_end_date)
        .bind(product.is_on_sale)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && (db_err.is_check_violation() || db_err.is_foreign_key_violation())
            {
                return RepositoryError::Conflict(db_err.message().to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }
}
