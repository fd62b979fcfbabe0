//! In-memory favorites set persisted to key-value storage.

use std::collections::BTreeSet;

use chatcart_core::ProductId;

use super::KeyValueStorage;

/// Storage key for the favorites list.
pub const FAVORITES_STORAGE_KEY: &str = "favorites";

/// A visitor's favorite products.
///
/// The set is read from storage once by [`Self::hydrate`]. Until hydration
/// completes no write reaches storage, so an empty initial set can never
/// overwrite favorites saved earlier. After hydration every change writes the
/// whole set as a JSON array of product IDs.
pub struct FavoritesSynchronizer<S> {
    storage: S,
    favorites: BTreeSet<ProductId>,
    hydrated: bool,
}

impl<S: KeyValueStorage> FavoritesSynchronizer<S> {
    /// Create an empty, not yet hydrated set.
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            favorites: BTreeSet::new(),
            hydrated: false,
        }
    }

    /// Create a set and hydrate it from storage.
    pub async fn load(storage: S) -> Self {
        let mut favorites = Self::new(storage);
        favorites.hydrate().await;
        favorites
    }

    /// Load the stored list, replacing the in-memory set.
    ///
    /// Missing, unreadable or malformed data yields an empty set. Entries
    /// that are not valid product IDs are dropped.
    pub async fn hydrate(&mut self) {
        self.favorites = match self.storage.read_string(FAVORITES_STORAGE_KEY).await {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read favorites, starting empty");
                BTreeSet::new()
            }
        };
        self.hydrated = true;
    }

    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.favorites.contains(&id)
    }

    /// Favorites in ascending ID order.
    #[must_use]
    pub fn favorites(&self) -> Vec<ProductId> {
        self.favorites.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    /// Add a product. No-op if already present.
    pub async fn add_favorite(&mut self, id: ProductId) {
        if self.favorites.insert(id) {
            self.persist().await;
        }
    }

    /// Remove a product. No-op if absent.
    pub async fn remove_favorite(&mut self, id: ProductId) {
        if self.favorites.remove(&id) {
            self.persist().await;
        }
    }

    /// Flip membership and return whether the product is now a favorite.
    pub async fn toggle_favorite(&mut self, id: ProductId) -> bool {
        let now_favorite = if self.favorites.remove(&id) {
            false
        } else {
            self.favorites.insert(id);
            true
        };
        self.persist().await;
        now_favorite
    }

    /// Remove every favorite.
    pub async fn clear_favorites(&mut self) {
        self.favorites.clear();
        self.persist().await;
    }

    async fn persist(&self) {
        if !self.hydrated {
            tracing::debug!("favorites not hydrated yet, skipping write");
            return;
        }

        let encoded = match serde_json::to_string(&self.favorites) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode favorites");
                return;
            }
        };

        if let Err(e) = self
            .storage
            .write_string(FAVORITES_STORAGE_KEY, &encoded)
            .await
        {
            tracing::warn!(error = %e, "failed to save favorites");
        }
    }
}

fn decode(raw: &str) -> BTreeSet<ProductId> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(entries) => entries
            .iter()
            .filter_map(|entry| entry.parse::<ProductId>().ok())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "stored favorites are malformed, starting empty");
            BTreeSet::new()
        }
    }
}
