//! WhatsApp checkout.
//!
//! Checkout does not take payment. The cart is rendered as a plain-text order
//! message and handed to WhatsApp through a `wa.me` deep link, where the
//! customer sends it to the store.

use chatcart_core::{
    CartItem, Price, calculate_cart_totals_by_currency, calculate_line_total,
    get_effective_price, get_sorted_currency_entries,
};
use thiserror::Error;

/// Errors building a checkout link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// The cart has no resolved items to order.
    #[error("cart is empty")]
    EmptyCart,

    /// The configured phone number has no digits.
    #[error("invalid WhatsApp phone number")]
    InvalidPhone,
}

/// Build the order message for a cart.
///
/// One line per resolved item with its effective unit price and line total,
/// then one `Total:` line per currency, USD first. Items whose product did not
/// resolve are left out.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` if no item resolves.
pub fn build_order_message(store_name: &str, items: &[CartItem]) -> Result<String, CheckoutError> {
    let mut lines = Vec::with_capacity(items.len() + 4);
    lines.push(format!("Hello {store_name}! I would like to order:"));

    for item in items {
        let Some(product) = &item.product else {
            continue;
        };
        let unit = get_effective_price(product);
        let line_total = calculate_line_total(unit, item.quantity);
        lines.push(format!(
            "- {} x {} ({}) = {}",
            item.quantity,
            product.name,
            Price::new(unit, product.currency.clone()),
            Price::new(line_total, product.currency.clone()),
        ));
    }

    if lines.len() == 1 {
        return Err(CheckoutError::EmptyCart);
    }

    lines.push(String::new());
    let totals = calculate_cart_totals_by_currency(items);
    for (currency, amount) in get_sorted_currency_entries(&totals) {
        lines.push(format!("Total: {}", Price::new(amount, currency)));
    }

    Ok(lines.join("\n"))
}

/// Build a `wa.me` link that opens a chat with `phone` and a prefilled message.
///
/// Everything except ASCII digits is stripped from `phone`.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidPhone` if `phone` has no digits.
pub fn whatsapp_url(phone: &str, message: &str) -> Result<String, CheckoutError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(CheckoutError::InvalidPhone);
    }
    Ok(format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(message)
    ))
}
