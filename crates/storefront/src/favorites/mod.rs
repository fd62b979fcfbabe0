//! Favorite products for one visitor.
//!
//! Favorites are convenience state: they live only in the visitor's own
//! key-value storage, are never synced anywhere else, and a failed write is
//! logged and otherwise ignored.

mod storage;
mod synchronizer;

pub use storage::{KeyValueStorage, MemoryStorage, SessionStorage, StorageError};
pub use synchronizer::{FAVORITES_STORAGE_KEY, FavoritesSynchronizer};
