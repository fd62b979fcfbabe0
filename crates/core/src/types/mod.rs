//! Core types for Chatcart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod currency;
pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use cart::{CartItem, CartOwner};
pub use currency::{CurrencyCode, CurrencyCodeError};
pub use id::*;
pub use price::Price;
pub use product::{Product, ProductError};
pub use status::StockStatus;
