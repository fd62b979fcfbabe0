//! Status enums for catalog entities.

use serde::{Deserialize, Serialize};

/// Stock level of a product, used for inventory alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    /// At or below the low-stock threshold but not empty.
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Default low-stock threshold used by the storefront and reports.
    pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

    /// Classify a stock level. Negative stock counts as out of stock.
    #[must_use]
    pub const fn from_stock(stock: i32, low_stock_threshold: i32) -> Self {
        if stock <= 0 {
            Self::OutOfStock
        } else if stock <= low_stock_threshold {
            Self::LowStock
        } else {
            Self::InStock
        }
    }

    /// Whether this status should raise an inventory alert.
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        !matches!(self, Self::InStock)
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InStock => write!(f, "in_stock"),
            Self::LowStock => write!(f, "low_stock"),
            Self::OutOfStock => write!(f, "out_of_stock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stock() {
        assert_eq!(StockStatus::from_stock(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_stock(-1, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_stock(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::from_stock(6, 5), StockStatus::InStock);
    }

    #[test]
    fn test_needs_attention() {
        assert!(!StockStatus::InStock.needs_attention());
        assert!(StockStatus::LowStock.needs_attention());
        assert!(StockStatus::OutOfStock.needs_attention());
    }
}
