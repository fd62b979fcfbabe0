//! Integration tests for the favorites synchronizer.

use chatcart_core::ProductId;
use chatcart_integration_tests::FlakyStorage;
use chatcart_storefront::favorites::{FAVORITES_STORAGE_KEY, FavoritesSynchronizer, MemoryStorage};

fn stored_ids(storage: &MemoryStorage) -> Vec<String> {
    let raw = storage.get(FAVORITES_STORAGE_KEY).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// =============================================================================
// Toggle
// =============================================================================

#[tokio::test]
async fn test_toggle_twice_returns_to_empty() {
    let storage = MemoryStorage::new();
    let mut favorites = FavoritesSynchronizer::load(storage.clone()).await;
    let p1 = ProductId::generate();

    assert!(favorites.toggle_favorite(p1).await);
    assert_eq!(favorites.favorites(), vec![p1]);
    assert_eq!(stored_ids(&storage), vec![p1.to_string()]);

    assert!(!favorites.toggle_favorite(p1).await);
    assert!(favorites.is_empty());
    assert!(stored_ids(&storage).is_empty());
}

#[tokio::test]
async fn test_favorites_survive_a_new_synchronizer() {
    let storage = MemoryStorage::new();
    let (a, b) = (ProductId::generate(), ProductId::generate());

    let mut first = FavoritesSynchronizer::load(storage.clone()).await;
    first.add_favorite(a).await;
    first.add_favorite(b).await;
    first.remove_favorite(a).await;

    let second = FavoritesSynchronizer::load(storage).await;
    assert!(second.is_favorite(b));
    assert!(!second.is_favorite(a));
    assert_eq!(second.len(), 1);
}

// =============================================================================
// Hydration
// =============================================================================

#[tokio::test]
async fn test_changes_before_hydration_never_overwrite_storage() {
    let saved = ProductId::generate();
    let storage =
        MemoryStorage::with_entry(FAVORITES_STORAGE_KEY, &format!("[\"{saved}\"]"));

    let mut favorites = FavoritesSynchronizer::new(storage.clone());
    favorites.toggle_favorite(ProductId::generate()).await;
    favorites.clear_favorites().await;
    assert_eq!(stored_ids(&storage), vec![saved.to_string()]);

    favorites.hydrate().await;
    assert!(favorites.is_hydrated());
    assert_eq!(favorites.favorites(), vec![saved]);
}

#[tokio::test]
async fn test_unreadable_storage_starts_empty_and_still_saves() {
    let storage = FlakyStorage::new(MemoryStorage::new());
    storage.set_fail_reads(true);

    let mut favorites = FavoritesSynchronizer::load(storage.clone()).await;
    assert!(favorites.is_hydrated());
    assert!(favorites.is_empty());

    let id = ProductId::generate();
    favorites.add_favorite(id).await;
    assert_eq!(storage.get(FAVORITES_STORAGE_KEY), Some(format!("[\"{id}\"]")));
}

#[tokio::test]
async fn test_failed_writes_keep_in_memory_state() {
    let storage = FlakyStorage::new(MemoryStorage::new());
    let mut favorites = FavoritesSynchronizer::load(storage.clone()).await;
    storage.set_fail_writes(true);

    let id = ProductId::generate();
    assert!(favorites.toggle_favorite(id).await);
    assert!(favorites.is_favorite(id));
    assert_eq!(storage.get(FAVORITES_STORAGE_KEY), None);

    storage.set_fail_writes(false);
    favorites.add_favorite(ProductId::generate()).await;
    assert_eq!(favorites.len(), 2);
    assert!(storage.get(FAVORITES_STORAGE_KEY).is_some());
}
