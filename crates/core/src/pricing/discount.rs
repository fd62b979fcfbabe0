//! Discount engine.
//!
//! Answers the questions every price display asks: is this sale running,
//! what does the customer actually pay, and how much do they save.
//!
//! # Effective price and the `is_on_sale` flag
//!
//! [`get_effective_price`] trusts [`Product::is_on_sale`] and does not
//! re-check the sale window. If the flag is left set after the window closes,
//! the sale price keeps being charged until admin tooling clears the flag.
//! Use [`has_valid_sale`] when the window itself matters.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Product;

/// Whether a sale window is running right now.
///
/// See [`is_sale_active_at`].
#[must_use]
pub fn is_sale_active(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    is_sale_active_at(start, end, Utc::now())
}

/// Whether a sale window contains `now`.
///
/// Both bounds are inclusive. A window missing either bound is never active.
#[must_use]
pub fn is_sale_active_at(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => start <= now && now <= end,
        _ => false,
    }
}

/// Whether the product has a real discount running right now.
///
/// See [`has_valid_sale_at`].
#[must_use]
pub fn has_valid_sale(product: &Product) -> bool {
    has_valid_sale_at(product, Utc::now())
}

/// Whether the product has a sale price below its regular price and a sale
/// window containing `now`.
///
/// A sale price at or above the regular price is "no discount", not an error.
#[must_use]
pub fn has_valid_sale_at(product: &Product, now: DateTime<Utc>) -> bool {
    product.sale_price.is_some_and(|sale| sale < product.price)
        && is_sale_active_at(product.sale_start_date, product.sale_end_date, now)
}

/// Discount as a whole percentage of the original price, rounded half up.
///
/// Returns 0 when `original <= 0`, `sale <= 0`, or `sale >= original`.
///
/// ```
/// use chatcart_core::calculate_discount_percentage;
/// use rust_decimal::Decimal;
///
/// assert_eq!(calculate_discount_percentage(Decimal::from(100), Decimal::from(75)), 25);
/// assert_eq!(calculate_discount_percentage(Decimal::from(100), Decimal::from(120)), 0);
/// ```
#[must_use]
pub fn calculate_discount_percentage(original: Decimal, sale: Decimal) -> u8 {
    if !is_discount(original, sale) {
        return 0;
    }

    // Divide first: `original * 100` overflows for prices near `Decimal::MAX`.
    let Some(percentage) = (original - sale)
        .checked_div(original)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    else {
        return 0;
    };

    percentage
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(0)
        .min(100)
}

/// Amount saved by paying `sale` instead of `original`.
///
/// Returns 0 under the same conditions as [`calculate_discount_percentage`].
#[must_use]
pub fn calculate_savings(original: Decimal, sale: Decimal) -> Decimal {
    if !is_discount(original, sale) {
        return Decimal::ZERO;
    }
    original - sale
}

/// The price the customer pays for one unit.
///
/// The sale price when the product is flagged as on sale and has a sale
/// price, the regular price otherwise.
#[must_use]
pub fn get_effective_price(product: &Product) -> Decimal {
    match product.sale_price {
        Some(sale) if product.is_on_sale => sale,
        _ => product.price,
    }
}

fn is_discount(original: Decimal, sale: Decimal) -> bool {
    original > Decimal::ZERO && sale > Decimal::ZERO && sale < original
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{CurrencyCode, ProductId};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn product(price: &str, sale_price: Option<&str>, is_on_sale: bool) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Ron añejo".to_owned(),
            slug: "ron-anejo".to_owned(),
            image_url: None,
            category_id: None,
            price: dec(price),
            currency: CurrencyCode::usd(),
            stock: 10,
            sale_price: sale_price.map(dec),
            sale_start_date: Some(at(2025, 1, 1)),
            sale_end_date: Some(at(2025, 1, 10)),
            is_on_sale,
        }
    }

    // =========================================================================
    // Sale window
    // =========================================================================

    #[test]
    fn test_sale_active_inside_window() {
        let start = Some(at(2025, 1, 1));
        let end = Some(at(2025, 1, 10));
        assert!(is_sale_active_at(start, end, at(2025, 1, 5)));
        assert!(!is_sale_active_at(start, end, at(2025, 2, 1)));
    }

    #[test]
    fn test_sale_window_bounds_are_inclusive() {
        let start = at(2025, 1, 1);
        let end = at(2025, 1, 10);
        assert!(is_sale_active_at(Some(start), Some(end), start));
        assert!(is_sale_active_at(Some(start), Some(end), end));
        assert!(!is_sale_active_at(
            Some(start),
            Some(end),
            end + chrono::Duration::seconds(1)
        ));
        assert!(!is_sale_active_at(
            Some(start),
            Some(end),
            start - chrono::Duration::seconds(1)
        ));
    }

    #[test]
    fn test_sale_missing_bound_never_active() {
        let now = at(2025, 1, 5);
        assert!(!is_sale_active_at(None, Some(at(2025, 1, 10)), now));
        assert!(!is_sale_active_at(Some(at(2025, 1, 1)), None, now));
        assert!(!is_sale_active_at(None, None, now));
        assert!(!is_sale_active(None, None));
    }

    #[test]
    fn test_sale_active_uses_clock() {
        let now = Utc::now();
        assert!(is_sale_active(
            Some(now - chrono::Duration::days(1)),
            Some(now + chrono::Duration::days(1))
        ));
    }

    #[test]
    fn test_has_valid_sale() {
        let now = at(2025, 1, 5);
        assert!(has_valid_sale_at(&product("100", Some("80"), true), now));
        // Flag does not matter here, only price and window.
        assert!(has_valid_sale_at(&product("100", Some("80"), false), now));
        assert!(!has_valid_sale_at(&product("100", Some("100"), true), now));
        assert!(!has_valid_sale_at(&product("100", Some("120"), true), now));
        assert!(!has_valid_sale_at(&product("100", None, true), now));
        assert!(!has_valid_sale_at(
            &product("100", Some("80"), true),
            at(2025, 3, 1)
        ));
    }

    // =========================================================================
    // Percentage and savings
    // =========================================================================

    #[test]
    fn test_discount_percentage_examples() {
        assert_eq!(calculate_discount_percentage(dec("100"), dec("75")), 25);
        assert_eq!(calculate_savings(dec("100"), dec("75")), dec("25"));
        assert_eq!(calculate_discount_percentage(dec("100"), dec("120")), 0);
        assert_eq!(calculate_savings(dec("100"), dec("120")), Decimal::ZERO);
    }

    #[test]
    fn test_discount_percentage_rounds_half_up() {
        // 12.5% -> 13
        assert_eq!(calculate_discount_percentage(dec("8"), dec("7")), 13);
        // 33.33% -> 33
        assert_eq!(calculate_discount_percentage(dec("3"), dec("2")), 33);
        // 66.67% -> 67
        assert_eq!(calculate_discount_percentage(dec("3"), dec("1")), 67);
    }

    #[test]
    fn test_discount_guards() {
        assert_eq!(calculate_discount_percentage(Decimal::ZERO, dec("5")), 0);
        assert_eq!(calculate_discount_percentage(dec("-10"), dec("-20")), 0);
        assert_eq!(calculate_discount_percentage(dec("10"), Decimal::ZERO), 0);
        assert_eq!(calculate_discount_percentage(dec("10"), dec("-1")), 0);
        assert_eq!(calculate_discount_percentage(dec("10"), dec("10")), 0);
        assert_eq!(calculate_savings(Decimal::ZERO, dec("5")), Decimal::ZERO);
        assert_eq!(calculate_savings(dec("10"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(calculate_savings(dec("10"), dec("10")), Decimal::ZERO);
    }

    #[test]
    fn test_discount_on_huge_prices_does_not_overflow() {
        assert_eq!(calculate_discount_percentage(Decimal::MAX, Decimal::ONE), 100);
        assert_eq!(calculate_discount_percentage(Decimal::from_i128_with_scale(10_i128.pow(27), 0), Decimal::ONE), 100);
        assert_eq!(
            calculate_discount_percentage(Decimal::MAX, Decimal::MAX - Decimal::ONE),
            0
        );
        assert_eq!(
            calculate_savings(Decimal::MAX, Decimal::ONE),
            Decimal::MAX - Decimal::ONE
        );
    }

    #[test]
    fn test_percentage_and_savings_bounds() {
        let values = ["-5", "0", "0.01", "1", "9.99", "50", "99.5", "100", "250"];
        for original in values {
            for sale in values {
                let (p, s) = (dec(original), dec(sale));
                let pct = calculate_discount_percentage(p, s);
                let savings = calculate_savings(p, s);
                assert!(pct <= 100, "{original}/{sale} gave {pct}");
                assert!(savings >= Decimal::ZERO, "{original}/{sale} gave {savings}");
                if s >= p || p <= Decimal::ZERO || s <= Decimal::ZERO {
                    assert_eq!(pct, 0);
                    assert_eq!(savings, Decimal::ZERO);
                }
                if savings.is_zero() {
                    assert_eq!(pct, 0);
                }
            }
        }
    }

    // =========================================================================
    // Effective price
    // =========================================================================

    #[test]
    fn test_effective_price_follows_flag() {
        assert_eq!(
            get_effective_price(&product("100", Some("80"), true)),
            dec("80")
        );
        assert_eq!(
            get_effective_price(&product("100", Some("80"), false)),
            dec("100")
        );
        assert_eq!(get_effective_price(&product("100", None, true)), dec("100"));
    }

    #[test]
    fn test_effective_price_trusts_stale_flag() {
        // Window long closed, flag still set: sale price is still charged.
        let mut stale = product("100", Some("80"), true);
        stale.sale_end_date = Some(at(2020, 1, 1));
        stale.sale_start_date = Some(at(2019, 12, 1));
        assert_eq!(get_effective_price(&stale), dec("80"));
        assert!(!has_valid_sale(&stale));
    }
}
