//! Chatcart Core - Shared types and pricing calculations.
//!
//! This crate provides common types used across all Chatcart components:
//! - `storefront` - Public catalog, cart, favorites and WhatsApp checkout
//! - `cli` - Command-line tools for migrations, seeding and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure calculations - no I/O, no
//! database access, no HTTP clients. Every pricing function is total: bad or
//! missing input degrades to zero/false instead of an error, so anything that
//! renders a price can always render something.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, currency codes, prices, products and cart items
//! - [`pricing`] - Discount engine and per-currency aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::*;
pub use types::*;
