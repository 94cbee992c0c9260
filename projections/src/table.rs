//! Typed read-model rows on top of a key-value [`ProjectionStore`].
//!
//! A [`ReadModelTable`] owns one key prefix of a projection store and encodes
//! its rows with `bincode`. Projections use it to read, fold and write back one
//! row per event without handling bytes or key formats themselves.

use composable_es_core::projection::{ProjectionError, ProjectionStore, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Rows of type `T` stored under `"{prefix}{id}"`.
///
/// # Example
///
/// ```
/// use composable_es_projections::ReadModelTable;
/// use composable_es_testing::InMemoryProjectionStore;
/// use std::sync::Arc;
///
/// # async fn example() -> composable_es_core::projection::Result<()> {
/// let store = Arc::new(InMemoryProjectionStore::new());
/// let totals: ReadModelTable<_, u64> = ReadModelTable::new(store, "cart_total:");
///
/// totals.save("42", &1_500).await?;
/// assert_eq!(totals.load("42").await?, Some(1_500));
/// assert_eq!(totals.key("42"), "cart_total:42");
/// # Ok(())
/// # }
/// ```
pub struct ReadModelTable<S, T> {
    store: Arc<S>,
    prefix: &'static str,
    row: PhantomData<fn() -> T>,
}

impl<S, T> ReadModelTable<S, T>
where
    S: ProjectionStore,
    T: Serialize + DeserializeOwned + Send,
{
    /// Create a table over `store` owning every key starting with `prefix`.
    #[must_use]
    pub const fn new(store: Arc<S>, prefix: &'static str) -> Self {
        Self {
            store,
            prefix,
            row: PhantomData,
        }
    }

    /// Key prefix owned by this table.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Storage key of the row for `id`.
    #[must_use]
    pub fn key(&self, id: impl fmt::Display) -> String {
        format!("{}{id}", self.prefix)
    }

    /// Load the row for `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the store fails or
    /// [`ProjectionError::Serialization`] if the row cannot be decoded.
    pub fn load(&self, id: impl fmt::Display) -> impl Future<Output = Result<Option<T>>> + Send {
        let key = self.key(id);
        async move {
            match self.store.get(&key).await? {
                Some(bytes) => Ok(Some(decode(&key, &bytes)?)),
                None => Ok(None),
            }
        }
    }

    /// Load the row for `id`, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::MissingReadModel`] naming `projection` if
    /// the row is absent, or any error of [`ReadModelTable::load`].
    pub fn require(
        &self,
        projection: &str,
        id: impl fmt::Display,
    ) -> impl Future<Output = Result<T>> + Send {
        let key = self.key(id);
        let projection = projection.to_string();
        async move {
            let bytes = self
                .store
                .get(&key)
                .await?
                .ok_or_else(|| ProjectionError::MissingReadModel {
                    projection,
                    key: key.clone(),
                })?;
            decode(&key, &bytes)
        }
    }

    /// Insert or replace the row for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Serialization`] if the row cannot be encoded
    /// or [`ProjectionError::Storage`] if the store fails.
    pub fn save(&self, id: impl fmt::Display, row: &T) -> impl Future<Output = Result<()>> + Send {
        let key = self.key(id);
        let encoded = bincode::serialize(row)
            .map_err(|e| ProjectionError::Serialization(format!("Failed to encode {key}: {e}")));
        async move { self.store.save(&key, &encoded?).await }
    }

    /// Delete the row for `id`. Deleting a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the store fails.
    pub fn delete(&self, id: impl fmt::Display) -> impl Future<Output = Result<()>> + Send {
        let key = self.key(id);
        async move { self.store.delete(&key).await }
    }

    /// Delete every row of this table, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if the store fails.
    pub async fn clear(&self) -> Result<usize> {
        self.store.clear_prefix(self.prefix).await
    }
}

impl<S, T> Clone for ReadModelTable<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix,
            row: PhantomData,
        }
    }
}

impl<S, T> fmt::Debug for ReadModelTable<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadModelTable")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| ProjectionError::Serialization(format!("Failed to decode {key}: {e}")))
}
