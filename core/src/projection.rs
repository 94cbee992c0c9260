//! Projection system for building and maintaining read models from events.
//!
//! # Overview
//!
//! Projections are the **query side of CQRS**. The write side folds events into
//! aggregates to decide; the read side folds the very same events into
//! denormalized rows shaped for queries.
//!
//! ## Key Concepts
//!
//! - **Projection**: Transforms events into optimized read models
//! - **Projection Store**: Keyed storage for projection rows
//! - **Rebuild**: Clearing a projection and replaying the full history into it
//!
//! ## Guarantees
//!
//! - Rows are written only by projections
//! - Events arrive in commit order, exactly once, right after they are appended
//! - Replaying full history from an empty store yields the same rows as
//!   incremental application
//!
//! ## Example
//!
//! ```ignore
//! use composable_es_core::projection::*;
//!
//! struct CartCountProjection<S: ProjectionStore> {
//!     store: Arc<S>,
//! }
//!
//! impl<S: ProjectionStore> Projection for CartCountProjection<S> {
//!     type Event = ShoppingCartEvent;
//!
//!     fn name(&self) -> &str {
//!         "cart_count"
//!     }
//!
//!     async fn apply_event(&self, event: &Self::Event) -> Result<()> {
//!         match event {
//!             ShoppingCartEvent::Opened { client_id, .. } => {
//!                 let key = format!("cart_count:{client_id}");
//!                 // read, increment, save
//!                 Ok(())
//!             }
//!             _ => Ok(()),
//!         }
//!     }
//! }
//! ```

use std::future::Future;

/// Error type for projection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Event processing error
    #[error("Event processing error: {0}")]
    EventProcessing(String),

    /// A row a later event depends on does not exist.
    ///
    /// Distinct from a row that was deleted on purpose; projections decide
    /// which events are allowed to find nothing.
    #[error("Projection {projection} is missing read model {key}")]
    MissingReadModel {
        /// Projection that needed the row.
        projection: String,
        /// Key of the missing row.
        key: String,
    },

    /// A row holds less than an event takes out of it.
    #[error("Read model contradicts history: {0}")]
    Contradiction(String),
}

impl ProjectionError {
    /// Whether the error means the read side contradicts the event history.
    #[must_use]
    pub const fn is_inconsistency(&self) -> bool {
        matches!(self, Self::MissingReadModel { .. } | Self::Contradiction(_))
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

/// A projection builds and maintains a read model from events.
///
/// # Philosophy
///
/// - **Deterministic**: The same events in the same order always produce the
///   same rows
/// - **Optimized for Reads**: Schema designed for query patterns, not writes
/// - **Rebuildable**: Can be dropped and rebuilt from events at any time
pub trait Projection: Send + Sync {
    /// The event type this projection listens to.
    type Event: Send + Sync;

    /// Get the projection name (used for logging and identification).
    ///
    /// Should be unique across all projections in the system.
    fn name(&self) -> &str;

    /// Apply an event to update the projection.
    ///
    /// Called once per committed event, in commit order. Events that do not
    /// concern this projection are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if event processing or storage fails, or
    /// [`ProjectionError::MissingReadModel`] if a row the event updates is absent.
    fn apply_event(&self, event: &Self::Event) -> impl Future<Output = Result<()>> + Send;

    /// Drop all rows so the projection can be rebuilt from full history.
    ///
    /// Default implementation is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if rows cannot be removed.
    fn rebuild(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Storage backend for projection data.
///
/// Rows are opaque bytes under string keys. Projections namespace their keys
/// with a prefix (`"cart_details:"`, `"client_summary:"`, ...) so one store can
/// hold several projections and each can be cleared independently.
///
/// # Example
///
/// ```ignore
/// store.save("cart_details:42", &bytes).await?;
/// let data = store.get("cart_details:42").await?;
/// store.clear_prefix("cart_details:").await?;
/// ```
pub trait ProjectionStore: Send + Sync {
    /// Save projection data to storage.
    ///
    /// Implementations should handle upserts (insert or update).
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if save fails.
    fn save(&self, key: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Get projection data by key.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if retrieval fails.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Delete projection data by key. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if deletion fails.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete every row whose key starts with `prefix`, returning how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if deletion fails.
    fn clear_prefix(&self, prefix: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Check if projection data exists.
    ///
    /// Default implementation uses [`ProjectionStore::get`].
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Storage`] if check fails.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }
}
