//! Key-value storage backends for favorites.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tower_sessions::Session;

/// Errors from a key-value storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The storage could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String storage keyed by name, private to one visitor.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn read_string(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn write_string(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Storage backed by the visitor's session.
///
/// The session is per-visitor and per-browser, which gives favorites the
/// same reach as on-device storage: no sharing between devices.
#[derive(Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl KeyValueStorage for SessionStorage {
    async fn read_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(key).await?)
    }

    async fn write_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.session.insert(key, value).await?;
        Ok(())
    }
}

/// In-process storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.values().insert(key.to_owned(), value.to_owned());
        storage
    }

    /// Current value for `key`, bypassing the async interface.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    async fn read_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    async fn write_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read_string("k").await.unwrap(), None);

        storage.write_string("k", "v").await.unwrap();
        assert_eq!(storage.read_string("k").await.unwrap().as_deref(), Some("v"));

        let shared = storage.clone();
        shared.write_string("k", "w").await.unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("w"));
    }

    #[tokio::test]
    async fn test_session_storage_reads_back_writes() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let storage = SessionStorage::new(session.clone());

        assert_eq!(storage.read_string("favorites").await.unwrap(), None);
        storage.write_string("favorites", "[]").await.unwrap();
        assert_eq!(
            session.get::<String>("favorites").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
