//! Chatcart Storefront library.
//!
//! Catalog, cart, favorites and WhatsApp checkout behind a JSON API. The
//! binary in `main.rs` wires these modules into an axum server; the library
//! form lets the CLI and integration tests reuse them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
