//! Catalog product type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CategoryId, CurrencyCode, ProductId};

/// Reasons a product is rejected on save.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product name is empty.
    #[error("product name cannot be empty")]
    EmptyName,
    /// The slug is empty.
    #[error("product slug cannot be empty")]
    EmptySlug,
    /// The regular price is negative.
    #[error("price cannot be negative (got {0})")]
    NegativePrice(Decimal),
    /// The regular price is at or above [`Product::MAX_PRICE`].
    #[error("price must be below {max} (got {price})")]
    PriceTooLarge {
        /// Configured price.
        price: Decimal,
        /// Exclusive upper bound.
        max: Decimal,
    },
    /// Stock is negative.
    #[error("stock cannot be negative (got {0})")]
    NegativeStock(i32),
    /// A sale is configured without a sale price.
    #[error("a sale requires a sale price")]
    MissingSalePrice,
    /// The sale price is zero or negative.
    #[error("sale price must be greater than zero (got {0})")]
    NonPositiveSalePrice(Decimal),
    /// The sale price does not undercut the regular price.
    #[error("sale price {sale} must be lower than the regular price {price}")]
    SalePriceNotLower {
        /// Configured sale price.
        sale: Decimal,
        /// Regular price.
        price: Decimal,
    },
    /// A sale is configured without both window dates.
    #[error("a sale requires both a start and an end date")]
    MissingSaleWindow,
    /// The sale window ends before (or when) it starts.
    #[error("sale end date must be after the start date")]
    InvalidSaleWindow,
}

/// A catalog product.
///
/// Products are created and edited by admin tooling and read by everything
/// that displays a price or totals a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Regular price in `currency`.
    pub price: Decimal,
    pub currency: CurrencyCode,
    /// Units available.
    pub stock: i32,
    pub sale_price: Option<Decimal>,
    pub sale_start_date: Option<DateTime<Utc>>,
    pub sale_end_date: Option<DateTime<Utc>>,
    /// Precomputed flag set by admin tooling. Effective pricing trusts it.
    pub is_on_sale: bool,
}

impl Product {
    /// Exclusive upper bound for `price`, matching the database CHECK.
    pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

    /// Whether any sale field is set.
    #[must_use]
    pub const fn has_sale_configured(&self) -> bool {
        self.is_on_sale
            || self.sale_price.is_some()
            || self.sale_start_date.is_some()
            || self.sale_end_date.is_some()
    }

    /// Validate the product before it is written.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProductError`] found: empty name or slug, a price
    /// outside `0..MAX_PRICE`, negative stock, or any sale rule from
    /// [`Product::validate_sale`].
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if self.slug.trim().is_empty() {
            return Err(ProductError::EmptySlug);
        }
        if self.price < Decimal::ZERO {
            return Err(ProductError::NegativePrice(self.price));
        }
        if self.price >= Self::MAX_PRICE {
            return Err(ProductError::PriceTooLarge {
                price: self.price,
                max: Self::MAX_PRICE,
            });
        }
        if self.stock < 0 {
            return Err(ProductError::NegativeStock(self.stock));
        }
        self.validate_sale()
    }

    /// Validate the sale configuration.
    ///
    /// A product with no sale fields at all is valid. Once any sale field is
    /// set, the sale price must be present, positive and strictly below the
    /// regular price, and both window dates must be present with the end
    /// after the start.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ProductError`].
    pub fn validate_sale(&self) -> Result<(), ProductError> {
        if !self.has_sale_configured() {
            return Ok(());
        }

        let sale = self.sale_price.ok_or(ProductError::MissingSalePrice)?;
        if sale <= Decimal::ZERO {
            return Err(ProductError::NonPositiveSalePrice(sale));
        }
        if sale >= self.price {
            return Err(ProductError::SalePriceNotLower {
                sale,
                price: self.price,
            });
        }

        match (self.sale_start_date, self.sale_end_date) {
            (Some(start), Some(end)) if end > start => Ok(()),
            (Some(_), Some(_)) => Err(ProductError::InvalidSaleWindow),
            _ => Err(ProductError::MissingSaleWindow),
        }
    }
}
