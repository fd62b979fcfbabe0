//! Pricing calculations.
//!
//! Everything here is a pure function of its inputs (plus the clock, for the
//! plain variants of the time-dependent functions). Nothing returns an error:
//! degenerate input resolves to zero or `false`, and amounts too large for
//! `Decimal` saturate instead of panicking.
//!
//! - [`discount`] - Sale windows, effective price, savings and percentages
//! - [`totals`] - Per-currency totals for carts and inventory

pub mod discount;
pub mod totals;

pub use discount::{
    calculate_discount_percentage, calculate_savings, get_effective_price, has_valid_sale,
    has_valid_sale_at, is_sale_active, is_sale_active_at,
};
pub use totals::{
    CurrencyTotals, calculate_cart_totals_by_currency, calculate_inventory_value_by_currency,
    calculate_line_total, get_sorted_currency_entries, has_multiple_currencies,
};
