//! In-memory projection testing utilities
//!
//! Provides fast, deterministic infrastructure for projections:
//! - [`InMemoryProjectionStore`]: HashMap-based projection storage
//! - [`ProjectionTestHarness`]: Fluent API for projection tests

#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use composable_es_core::projection::{Projection, ProjectionError, ProjectionStore, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory projection store for fast, deterministic testing.
///
/// Complements [`InMemoryEventStore`](crate::InMemoryEventStore) to provide
/// a complete in-memory infrastructure.
///
/// # Example
///
/// ```
/// use composable_es_testing::InMemoryProjectionStore;
/// use composable_es_core::projection::ProjectionStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryProjectionStore::new();
///
/// // Save projection data
/// store.save("cart_details:123", b"cart data").await?;
///
/// // Retrieve projection data
/// let data = store.get("cart_details:123").await?;
/// assert!(data.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryProjectionStore {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryProjectionStore {
    /// Create a new empty in-memory projection store
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .read()
            .map_err(|_| ProjectionError::Storage("projection store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .write()
            .map_err(|_| ProjectionError::Storage("projection store lock poisoned".to_string()))
    }

    /// Clear all projection data (for test isolation)
    ///
    /// A poisoned store is left as is and reported with a warning.
    pub fn clear(&self) {
        match self.write() {
            Ok(mut data) => data.clear(),
            Err(error) => tracing::warn!(%error, "Projection store not cleared"),
        }
    }

    /// Get the number of stored rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().map_or(0, |data| data.len())
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a key exists in the store
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().is_ok_and(|data| data.contains_key(key))
    }

    /// Get all keys in the store, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Copy of every row, ordered by key.
    ///
    /// Two stores built from the same history compare equal through their
    /// snapshots.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.read()
            .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryProjectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionStore for InMemoryProjectionStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        self.write()?.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let mut data = self.write()?;
        let before = data.len();
        data.retain(|key, _| !key.starts_with(prefix));
        Ok(before - data.len())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }
}

/// Test harness for projections providing a fluent testing API.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryProjectionStore::new());
/// let projection = CartDetailsProjection::new(store.clone());
/// let mut harness = ProjectionTestHarness::new(projection, store);
///
/// harness
///     .given_events(vec![opened, item_added])
///     .await?
///     .then_contains("cart_details:1")
///     .await?;
/// ```
pub struct ProjectionTestHarness<P: Projection> {
    projection: P,
    store: Arc<InMemoryProjectionStore>,
}

impl<P: Projection> ProjectionTestHarness<P> {
    /// Create a new test harness for the given projection.
    ///
    /// `store` must be the instance the projection writes to.
    #[must_use]
    pub const fn new(projection: P, store: Arc<InMemoryProjectionStore>) -> Self {
        Self { projection, store }
    }

    /// Apply a series of events to the projection, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if any event fails to apply.
    pub async fn given_events(&mut self, events: Vec<P::Event>) -> Result<&mut Self> {
        for event in events {
            self.projection.apply_event(&event).await?;
        }
        Ok(self)
    }

    /// Apply a single event to the projection.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the event fails to apply.
    pub async fn given_event(&mut self, event: P::Event) -> Result<&mut Self> {
        self.projection.apply_event(&event).await?;
        Ok(self)
    }

    /// Assert that the projection store contains the given key.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the query fails.
    ///
    /// # Panics
    ///
    /// Panics if the key is not found in the store (this is a test assertion).
    #[allow(clippy::panic)] // Intentional panic for test assertions
    pub async fn then_contains(&self, key: &str) -> Result<&Self> {
        let exists = self.store.exists(key).await?;
        assert!(
            exists,
            "Expected projection store to contain key '{key}', but it was not found"
        );
        Ok(self)
    }

    /// Assert that the projection store does not contain the given key.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the query fails.
    ///
    /// # Panics
    ///
    /// Panics if the key is found in the store (this is a test assertion).
    #[allow(clippy::panic)] // Intentional panic for test assertions
    pub async fn then_not_contains(&self, key: &str) -> Result<&Self> {
        let exists = self.store.exists(key).await?;
        assert!(
            !exists,
            "Expected projection store to NOT contain key '{key}', but it was found"
        );
        Ok(self)
    }

    /// Get data from the projection store.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the query fails.
    pub async fn get_data(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(key).await
    }

    /// Get a reference to the underlying projection store.
    #[must_use]
    pub const fn store(&self) -> &Arc<InMemoryProjectionStore> {
        &self.store
    }

    /// Get a reference to the projection.
    ///
    /// Useful for calling projection-specific query methods.
    #[must_use]
    pub const fn projection(&self) -> &P {
        &self.projection
    }

    /// Get the number of entries in the projection store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the projection store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    fn poison(store: &InMemoryProjectionStore) {
        let data = Arc::clone(&store.data);
        let _joined = std::thread::spawn(move || {
            let _guard = data.write().unwrap();
            panic!("poison the projection store");
        })
        .join();
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = InMemoryProjectionStore::new();
        store.save("row:1", b"one").await.unwrap();

        store.clear();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clear_leaves_a_poisoned_store_untouched() {
        let store = InMemoryProjectionStore::new();
        store.save("row:1", b"one").await.unwrap();
        poison(&store);

        store.clear();

        assert!(store.data.is_poisoned());
        let error = store.get("row:1").await.unwrap_err();
        assert!(matches!(error, ProjectionError::Storage(_)));
    }
}
