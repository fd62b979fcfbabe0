//! Catalog reports.

use rust_decimal::Decimal;
use tracing::{info, warn};

use chatcart_core::{
    CurrencyCode, Price, Product, StockStatus, calculate_inventory_value_by_currency,
    get_sorted_currency_entries,
};
use chatcart_storefront::db::ProductRepository;

use super::connect;

/// Inventory valuation and stock alerts.
#[derive(Debug)]
pub struct InventoryReport {
    /// Stock value at regular price, USD first.
    pub value_by_currency: Vec<(CurrencyCode, Decimal)>,
    /// Products needing restock, out-of-stock first, then by stock and name.
    pub alerts: Vec<StockAlert>,
}

/// A product at or below the low-stock threshold.
#[derive(Debug, PartialEq, Eq)]
pub struct StockAlert {
    pub slug: String,
    pub name: String,
    pub stock: i32,
    pub status: StockStatus,
}

impl InventoryReport {
    /// Build the report for a product list.
    #[must_use]
    pub fn new(products: &[Product], low_stock_threshold: i32) -> Self {
        let totals = calculate_inventory_value_by_currency(products);

        let mut alerts: Vec<StockAlert> = products
            .iter()
            .filter_map(|product| {
                let status = StockStatus::from_stock(product.stock, low_stock_threshold);
                status.needs_attention().then(|| StockAlert {
                    slug: product.slug.clone(),
                    name: product.name.clone(),
                    stock: product.stock,
                    status,
                })
            })
            .collect();
        alerts.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        Self {
            value_by_currency: get_sorted_currency_entries(&totals),
            alerts,
        }
    }
}

/// Print inventory value per currency and stock alerts.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or a query fails.
pub async fn inventory(low_stock_threshold: i32) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;
    let products = ProductRepository::new(&pool).list().await?;

    let report = InventoryReport::new(&products, low_stock_threshold);

    info!(products = products.len(), "Inventory value by currency:");
    for (currency, amount) in &report.value_by_currency {
        info!("  {currency}: {}", Price::new(*amount, currency.clone()));
    }

    if report.alerts.is_empty() {
        info!(threshold = low_stock_threshold, "No stock alerts");
        return Ok(());
    }

    warn!(
        count = report.alerts.len(),
        threshold = low_stock_threshold,
        "Stock alerts:"
    );
    for alert in &report.alerts {
        warn!("  [{}] {} ({}): {} left", alert.status, alert.name, alert.slug, alert.stock);
    }

    Ok(())
}
