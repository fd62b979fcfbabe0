//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                             - Liveness check
//! GET    /health/ready                       - Database readiness check
//!
//! # Catalog
//! GET    /api/products                       - Product listing (?category=)
//! GET    /api/products/{id}                  - Product detail
//!
//! # Cart
//! GET    /api/cart                           - Current cart
//! POST   /api/cart/items                     - Add a product
//! PATCH  /api/cart/items/{id}                - Set a line's quantity
//! DELETE /api/cart/items/{id}                - Remove a line
//! DELETE /api/cart                           - Empty the cart
//!
//! # Favorites
//! GET    /api/favorites                      - List favorites
//! PUT    /api/favorites/{product_id}         - Add a favorite
//! DELETE /api/favorites/{product_id}         - Remove a favorite
//! POST   /api/favorites/{product_id}/toggle  - Toggle a favorite
//! DELETE /api/favorites                      - Remove all favorites
//!
//! # Checkout
//! GET    /api/checkout                       - Order message and WhatsApp link
//! GET    /checkout                           - Redirect to WhatsApp
//! ```

pub mod cart;
pub mod checkout;
pub mod favorites;
pub mod health;
pub mod products;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::show))
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/favorites", get(favorites::list).delete(favorites::clear))
        .route(
            "/favorites/{product_id}",
            put(favorites::add).delete(favorites::remove),
        )
        .route("/favorites/{product_id}/toggle", post(favorites::toggle))
        .route("/checkout", get(checkout::show))
}

/// Create the main routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/checkout", get(checkout::redirect))
        .nest("/api", api_routes())
}
