//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use chatcart_core::{
    CategoryId, CurrencyCode, Price, Product, ProductId, StockStatus,
    calculate_discount_percentage, calculate_savings, get_effective_price, has_valid_sale_at,
};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product with its pricing worked out for display.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub currency: CurrencyCode,
    /// Regular price.
    pub price: Decimal,
    /// Price charged now.
    pub effective_price: Decimal,
    /// `effective_price` formatted with its currency.
    pub display_price: String,
    /// Regular price formatted, present only when discounted.
    pub compare_at_price: Option<String>,
    /// Whether the sale flag applies to the price.
    pub is_on_sale: bool,
    /// Whether the sale window includes now. Can disagree with `is_on_sale`
    /// until admin tooling refreshes the flag.
    pub sale_active: bool,
    pub discount_percentage: u8,
    pub savings: Decimal,
    pub stock: i32,
    pub stock_status: StockStatus,
}

impl ProductView {
    /// Build the view as of `now`.
    #[must_use]
    pub fn new(product: &Product, low_stock_threshold: i32, now: DateTime<Utc>) -> Self {
        let effective_price = get_effective_price(product);
        let discounted = effective_price < product.price;

        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            image_url: product.image_url.clone(),
            category_id: product.category_id,
            currency: product.currency.clone(),
            price: product.price,
            effective_price,
            display_price: Price::new(effective_price, product.currency.clone()).display(),
            compare_at_price: discounted
                .then(|| Price::new(product.price, product.currency.clone()).display()),
            is_on_sale: product.is_on_sale,
            sale_active: has_valid_sale_at(product, now),
            discount_percentage: calculate_discount_percentage(product.price, effective_price),
            savings: calculate_savings(product.price, effective_price),
            stock: product.stock,
            stock_status: StockStatus::from_stock(product.stock, low_stock_threshold),
        }
    }
}

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Category slug.
    pub category: Option<String>,
}

/// List the catalog, optionally filtered by category.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let repo = ProductRepository::new(state.pool());
    let products = match query.category {
        Some(slug) => repo.list_by_category(&slug).await?,
        None => repo.list().await?,
    };

    let now = Utc::now();
    let threshold = state.config().low_stock_threshold;
    Ok(Json(
        products
            .iter()
            .map(|product| ProductView::new(product, threshold, now))
            .collect(),
    ))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(ProductView::new(
        &product,
        state.config().low_stock_threshold,
        Utc::now(),
    )))
}
