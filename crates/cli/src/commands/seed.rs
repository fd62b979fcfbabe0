//! Seed the catalog from a YAML file.
//!
//! The whole file is parsed and validated before connecting to the database.
//! If any product is invalid, every problem is reported and nothing is
//! written. Categories and products are upserted by slug, so the command can
//! be re-run after editing the file.
//!
//! # File Format
//!
//! ```yaml
//! categories:
//!   - name: Drinks
//!     slug: drinks
//! products:
//!   - name: Coffee
//!     slug: coffee
//!     price: "3.50"
//!     currency: USD
//!     stock: 20
//!     category: drinks
//!     sale_price: "3.00"
//!     sale_start_date: 2026-03-01T00:00:00Z
//!     sale_end_date: 2026-03-31T23:59:59Z
//!     is_on_sale: true
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use chatcart_core::{CurrencyCode, Product, ProductId};
use chatcart_storefront::db::{CategoryRepository, ProductRepository};

use super::connect;

/// A catalog file.
#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A category entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
}

/// A product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stock: i32,
    pub image_url: Option<String>,
    /// Slug of a category declared in the same file.
    pub category: Option<String>,
    pub sale_price: Option<Decimal>,
    pub sale_start_date: Option<DateTime<Utc>>,
    pub sale_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_on_sale: bool,
}

fn default_currency() -> String {
    CurrencyCode::USD.to_owned()
}

/// A product that passed validation, with its category slug.
#[derive(Debug)]
pub struct ValidatedProduct {
    pub product: Product,
    pub category: Option<String>,
}

/// Parse a catalog file.
///
/// # Errors
///
/// Returns an error if the YAML is malformed.
pub fn parse_catalog(content: &str) -> Result<SeedCatalog, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Validate every entry, collecting all problems.
///
/// # Errors
///
/// Returns one message per problem found.
pub fn validate_catalog(catalog: &SeedCatalog) -> Result<Vec<ValidatedProduct>, Vec<String>> {
    let mut errors = Vec::new();

    let mut category_slugs = HashSet::new();
    for category in &catalog.categories {
        if category.slug.trim().is_empty() {
            errors.push(format!("category '{}': slug cannot be empty", category.name));
        } else if !category_slugs.insert(category.slug.as_str()) {
            errors.push(format!("category '{}': duplicate slug", category.slug));
        }
    }

    let mut product_slugs = HashSet::new();
    let mut validated = Vec::with_capacity(catalog.products.len());
    for entry in &catalog.products {
        let label = if entry.slug.is_empty() {
            entry.name.as_str()
        } else {
            entry.slug.as_str()
        };

        // Empty slugs are reported by `Product::validate` below.
        if !entry.slug.trim().is_empty() && !product_slugs.insert(entry.slug.as_str()) {
            errors.push(format!("product '{label}': duplicate slug"));
        }

        if let Some(category) = &entry.category
            && !category_slugs.contains(category.as_str())
        {
            errors.push(format!("product '{label}': unknown category '{category}'"));
        }

        let currency = match CurrencyCode::parse(&entry.currency) {
            Ok(currency) => currency,
            Err(e) => {
                errors.push(format!("product '{label}': {e}"));
                continue;
            }
        };

        let product = Product {
            id: ProductId::generate(),
            name: entry.name.clone(),
            slug: entry.slug.clone(),
            image_url: entry.image_url.clone(),
            category_id: None,
            price: entry.price,
            currency,
            stock: entry.stock,
            sale_price: entry.sale_price,
            sale_start_date: entry.sale_start_date,
            sale_end_date: entry.sale_end_date,
            is_on_sale: entry.is_on_sale,
        };

        if let Err(e) = product.validate() {
            errors.push(format!("product '{label}': {e}"));
            continue;
        }

        validated.push(ValidatedProduct {
            product,
            category: entry.category.clone(),
        });
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Seed categories and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if any entry is
/// invalid, or if a database operation fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let catalog = parse_catalog(&content)?;
    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Parsed catalog"
    );

    let products = match validate_catalog(&catalog) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!("Catalog validated successfully");

    let pool = connect().await?;

    let categories = CategoryRepository::new(&pool);
    let mut category_ids = HashMap::new();
    for entry in &catalog.categories {
        let category = categories.upsert(&entry.name, &entry.slug).await?;
        category_ids.insert(category.slug.clone(), category.id);
    }

    let repo = ProductRepository::new(&pool);
    for ValidatedProduct {
        mut product,
        category,
    } in products
    {
        product.category_id = category.and_then(|slug| category_ids.get(&slug).copied());
        let stored = repo.upsert(&product).await?;
        info!(slug = %stored.slug, id = %stored.id, "Upserted product");
    }

    info!(
        categories = category_ids.len(),
        products = catalog.products.len(),
        "Seeding complete"
    );
    Ok(())
}
