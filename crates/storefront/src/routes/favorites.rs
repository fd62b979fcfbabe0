//! Favorites route handlers.
//!
//! Favorites live in the visitor's session. Each request hydrates a
//! [`FavoritesSynchronizer`] from the session before touching the set.

use axum::{Json, extract::Path};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use chatcart_core::ProductId;

use crate::error::add_breadcrumb;
use crate::favorites::{FavoritesSynchronizer, KeyValueStorage, SessionStorage};

/// Favorites display data.
#[derive(Debug, Clone, Serialize)]
pub struct FavoritesView {
    pub product_ids: Vec<ProductId>,
    pub count: usize,
}

impl<S: KeyValueStorage> From<&FavoritesSynchronizer<S>> for FavoritesView {
    fn from(favorites: &FavoritesSynchronizer<S>) -> Self {
        Self {
            product_ids: favorites.favorites(),
            count: favorites.len(),
        }
    }
}

/// Result of a toggle.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleView {
    pub product_id: ProductId,
    pub is_favorite: bool,
    pub count: usize,
}

async fn load(session: Session) -> FavoritesSynchronizer<SessionStorage> {
    FavoritesSynchronizer::load(SessionStorage::new(session)).await
}

/// List favorites.
#[instrument(skip(session))]
pub async fn list(session: Session) -> Json<FavoritesView> {
    let favorites = load(session).await;
    Json(FavoritesView::from(&favorites))
}

/// Add a favorite.
#[instrument(skip(session))]
pub async fn add(session: Session, Path(product_id): Path<ProductId>) -> Json<FavoritesView> {
    let mut favorites = load(session).await;
    favorites.add_favorite(product_id).await;
    Json(FavoritesView::from(&favorites))
}

/// Remove a favorite.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Json<FavoritesView> {
    let mut favorites = load(session).await;
    favorites.remove_favorite(product_id).await;
    Json(FavoritesView::from(&favorites))
}

/// Flip a product's favorite state.
#[instrument(skip(session))]
pub async fn toggle(session: Session, Path(product_id): Path<ProductId>) -> Json<ToggleView> {
    let mut favorites = load(session).await;
    let is_favorite = favorites.toggle_favorite(product_id).await;
    add_breadcrumb(
        "favorites",
        "Toggled favorite",
        &[
            ("product_id", product_id.to_string()),
            ("is_favorite", is_favorite.to_string()),
        ],
    );

    Json(ToggleView {
        product_id,
        is_favorite,
        count: favorites.len(),
    })
}

/// Remove every favorite.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Json<FavoritesView> {
    let mut favorites = load(session).await;
    favorites.clear_favorites().await;
    Json(FavoritesView::from(&favorites))
}
