//! Per-currency aggregation.
//!
//! The catalog mixes currencies without converting between them, so every
//! total is a map from currency code to amount ("currency buckets").

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::discount::get_effective_price;
use crate::types::{CartItem, CurrencyCode, Product};

/// Summed monetary amounts keyed by currency code.
///
/// Derived on every read, never persisted. An empty input gives an empty map,
/// not a zero entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyTotals(BTreeMap<CurrencyCode, Decimal>);

impl CurrencyTotals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the bucket for `currency`.
    ///
    /// A bucket that would overflow saturates at `Decimal::MAX` (or `MIN`).
    pub fn add(&mut self, currency: &CurrencyCode, amount: Decimal) {
        let bucket = self.0.entry(currency.clone()).or_insert(Decimal::ZERO);
        *bucket = bucket.checked_add(amount).unwrap_or_else(|| {
            tracing::warn!(%currency, "currency total overflowed, saturating");
            saturated(amount.is_sign_negative())
        });
    }

    /// Per-key sum of two totals.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        for (currency, amount) in &other.0 {
            self.add(currency, *amount);
        }
        self
    }

    #[must_use]
    pub fn get(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.0.get(currency).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in ascending currency-code order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &Decimal)> {
        self.0.iter()
    }
}

impl FromIterator<(CurrencyCode, Decimal)> for CurrencyTotals {
    fn from_iter<I: IntoIterator<Item = (CurrencyCode, Decimal)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (currency, amount) in iter {
            totals.add(&currency, amount);
        }
        totals
    }
}

/// `unit_price * quantity`, saturating instead of overflowing.
#[must_use]
pub fn calculate_line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    checked_product(unit_price, Decimal::from(quantity))
}

fn checked_product(amount: Decimal, factor: Decimal) -> Decimal {
    amount.checked_mul(factor).unwrap_or_else(|| {
        tracing::warn!(%amount, %factor, "line amount overflowed, saturating");
        saturated(amount.is_sign_negative() != factor.is_sign_negative())
    })
}

const fn saturated(negative: bool) -> Decimal {
    if negative { Decimal::MIN } else { Decimal::MAX }
}

/// Total the effective price of every resolved cart line, per currency.
///
/// Lines whose product did not resolve are skipped.
#[must_use]
pub fn calculate_cart_totals_by_currency<'a, I>(items: I) -> CurrencyTotals
where
    I: IntoIterator<Item = &'a CartItem>,
{
    let mut totals = CurrencyTotals::new();
    for item in items {
        let Some(product) = item.product.as_ref() else {
            continue;
        };
        totals.add(
            &product.currency,
            calculate_line_total(get_effective_price(product), item.quantity),
        );
    }
    totals
}

/// Value the stock on hand at regular price, per currency.
///
/// Sale prices are ignored: this is a stock valuation, not projected revenue.
/// Negative stock counts as zero.
#[must_use]
pub fn calculate_inventory_value_by_currency<'a, I>(products: I) -> CurrencyTotals
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut totals = CurrencyTotals::new();
    for product in products {
        totals.add(
            &product.currency,
            checked_product(product.price, Decimal::from(product.stock.max(0))),
        );
    }
    totals
}

/// Entries for display: `USD` first when present, then ascending by code.
#[must_use]
pub fn get_sorted_currency_entries(totals: &CurrencyTotals) -> Vec<(CurrencyCode, Decimal)> {
    let (usd, rest): (Vec<_>, Vec<_>) = totals
        .iter()
        .map(|(currency, amount)| (currency.clone(), *amount))
        .partition(|(currency, _)| currency.is_usd());

    usd.into_iter().chain(rest).collect()
}

/// Whether the totals span more than one currency.
#[must_use]
pub fn has_multiple_currencies(totals: &CurrencyTotals) -> bool {
    totals.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartItemId, ProductId};

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn product(price: i64, currency: &str, stock: i32) -> Product {
        Product {
            id: ProductId::generate(),
            name: format!("{currency} item"),
            slug: format!("{}-item", currency.to_lowercase()),
            image_url: None,
            category_id: None,
            price: Decimal::from(price),
            currency: code(currency),
            stock,
            sale_price: None,
            sale_start_date: None,
            sale_end_date: None,
            is_on_sale: false,
        }
    }

    fn item(product: Option<Product>, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(uuid::Uuid::new_v4()),
            product_id: product.as_ref().map_or_else(ProductId::generate, |p| p.id),
            quantity,
            product,
        }
    }

    // =========================================================================
    // Cart totals
    // =========================================================================

    #[test]
    fn test_cart_totals_two_currencies() {
        let items = vec![
            item(Some(product(10, "USD", 5)), 2),
            item(Some(product(5, "EUR", 5)), 3),
        ];
        let totals = calculate_cart_totals_by_currency(&items);

        assert_eq!(totals.get(&code("USD")), Some(Decimal::from(20)));
        assert_eq!(totals.get(&code("EUR")), Some(Decimal::from(15)));
        assert_eq!(
            get_sorted_currency_entries(&totals),
            vec![
                (code("USD"), Decimal::from(20)),
                (code("EUR"), Decimal::from(15))
            ]
        );
        assert!(has_multiple_currencies(&totals));
    }

    #[test]
    fn test_cart_totals_use_effective_price() {
        let mut on_sale = product(100, "MXN", 5);
        on_sale.sale_price = Some(Decimal::from(80));
        on_sale.is_on_sale = true;
        let items = vec![item(Some(on_sale), 2)];

        let totals = calculate_cart_totals_by_currency(&items);
        assert_eq!(totals.get(&code("MXN")), Some(Decimal::from(160)));
    }

    #[test]
    fn test_cart_totals_skip_unresolved_products() {
        let items = vec![item(None, 4), item(Some(product(3, "CUP", 1)), 1)];
        let totals = calculate_cart_totals_by_currency(&items);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get(&code("CUP")), Some(Decimal::from(3)));
    }

    #[test]
    fn test_empty_input_gives_empty_totals() {
        let totals = calculate_cart_totals_by_currency(&Vec::<CartItem>::new());
        assert!(totals.is_empty());
        assert!(!has_multiple_currencies(&totals));
        assert!(get_sorted_currency_entries(&totals).is_empty());
        assert!(calculate_inventory_value_by_currency(&Vec::<Product>::new()).is_empty());
    }

    #[test]
    fn test_cart_totals_are_additive() {
        let first = vec![
            item(Some(product(10, "USD", 5)), 2),
            item(Some(product(7, "EUR", 5)), 1),
            item(None, 9),
        ];
        let second = vec![
            item(Some(product(4, "USD", 5)), 3),
            item(Some(product(2, "CUP", 5)), 10),
        ];

        let combined: Vec<CartItem> = first.iter().chain(&second).cloned().collect();
        let merged = calculate_cart_totals_by_currency(&first)
            .merge(&calculate_cart_totals_by_currency(&second));

        assert_eq!(calculate_cart_totals_by_currency(&combined), merged);
    }

    #[test]
    fn test_huge_line_totals_saturate() {
        let mut huge = product(1, "USD", 1000);
        huge.price = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        assert_eq!(calculate_line_total(huge.price, 100), Decimal::MAX);

        let items = vec![item(Some(huge.clone()), 100), item(Some(huge), 1)];
        let totals = calculate_cart_totals_by_currency(&items);
        assert_eq!(totals.get(&code("USD")), Some(Decimal::MAX));
    }

    #[test]
    fn test_totals_saturate_on_sum_overflow() {
        let mut totals = CurrencyTotals::new();
        totals.add(&code("EUR"), Decimal::MAX);
        totals.add(&code("EUR"), Decimal::ONE);
        assert_eq!(totals.get(&code("EUR")), Some(Decimal::MAX));
    }

    // =========================================================================
    // Inventory value
    // =========================================================================

    #[test]
    fn test_huge_inventory_value_saturates() {
        let mut huge = product(1, "CUP", 1000);
        huge.price = Decimal::from_i128_with_scale(10_i128.pow(27), 0);

        let totals = calculate_inventory_value_by_currency(&[huge]);
        assert_eq!(totals.get(&code("CUP")), Some(Decimal::MAX));
    }

    #[test]
    fn test_inventory_value_ignores_sale_price() {
        let mut on_sale = product(100, "USD", 3);
        on_sale.sale_price = Some(Decimal::from(50));
        on_sale.is_on_sale = true;
        let products = vec![on_sale, product(20, "EUR", 2), product(5, "EUR", -4)];

        let totals = calculate_inventory_value_by_currency(&products);
        assert_eq!(totals.get(&code("USD")), Some(Decimal::from(300)));
        assert_eq!(totals.get(&code("EUR")), Some(Decimal::from(40)));
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    #[test]
    fn test_sorted_entries_usd_first_then_lexicographic() {
        let totals: CurrencyTotals = [
            (code("MXN"), Decimal::ONE),
            (code("USD"), Decimal::TWO),
            (code("CUP"), Decimal::TEN),
            (code("EUR"), Decimal::ONE),
        ]
        .into_iter()
        .collect();

        let order: Vec<String> = get_sorted_currency_entries(&totals)
            .into_iter()
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(order, ["USD", "CUP", "EUR", "MXN"]);
    }

    #[test]
    fn test_sorted_entries_without_usd() {
        let totals: CurrencyTotals = [(code("EUR"), Decimal::ONE), (code("CUP"), Decimal::ONE)]
            .into_iter()
            .collect();

        let entries = get_sorted_currency_entries(&totals);
        assert_eq!(entries.first().map(|(c, _)| c.as_str()), Some("CUP"));
        assert!(entries.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_single_currency_is_not_multiple() {
        let totals: CurrencyTotals = [(code("USD"), Decimal::ONE), (code("usd"), Decimal::ONE)]
            .into_iter()
            .collect();
        assert_eq!(totals.get(&code("USD")), Some(Decimal::TWO));
        assert!(!has_multiple_currencies(&totals));
    }
}
