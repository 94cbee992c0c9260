//! Event store trait and related types for event sourcing.
//!
//! This module defines the core abstraction for an event store - an append-only
//! log of event streams guarded by optimistic concurrency control.
//!
//! # Design
//!
//! The `EventStore` trait provides exactly what event sourcing needs:
//!
//! - Read a stream together with its current version
//! - Append to a stream only if it is still at the version the caller observed
//! - Read every recorded event in global commit order (projection rebuilds)
//!
//! Compare-and-append is the only serialization point. No lock is held between
//! a read and the append that follows it; a writer that lost the race finds
//! out when its append is rejected.
//!
//! # Implementations
//!
//! - `InMemoryEventStore` (in `composable-es-testing` crate): Fast, deterministic,
//!   conforming implementation used by tests and the demo binary
//!
//! # Example
//!
//! ```no_run
//! use composable_es_core::event_store::{EventStore, EventStoreError};
//! use composable_es_core::stream::{StreamId, Version};
//!
//! async fn example<E: EventStore>(store: &E) -> Result<(), EventStoreError> {
//!     let stream_id = StreamId::new("shopping_cart-123");
//!
//!     // Read events and the version they were read at
//!     let stream = store.load_events(stream_id.clone()).await?;
//!
//!     // Append new events only if nobody else appended in between
//!     let events = vec![/* ... */];
//!     let new_version = store
//!         .append_events(stream_id, stream.version, events)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use crate::event::{RecordedEvent, SerializedEvent};
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: expected version doesn't match current version.
    ///
    /// Another writer appended to the stream after the caller read it. Nothing
    /// was appended.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream ID where the conflict occurred.
        stream_id: StreamId,
        /// The version we expected the stream to be at.
        expected: Version,
        /// The actual current version of the stream.
        actual: Version,
    },

    /// Storage backend error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EventStoreError {
    /// Whether this error is an optimistic concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Events of one stream together with the version they were read at.
///
/// `version` equals `events.len()`; an unknown stream reads as no events at
/// version 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamEvents {
    /// Recorded events, oldest first.
    pub events: Vec<RecordedEvent>,

    /// Stream version observed by this read.
    pub version: Version,
}

impl StreamEvents {
    /// Whether the stream has no events (never appended to).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Event store abstraction for storing and retrieving event streams.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely used in async contexts
/// and shared across threads.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn EventStore>`), which is how command
/// handlers and projection engines hold their store.
pub trait EventStore: Send + Sync {
    /// Append events to a stream with optimistic concurrency control.
    ///
    /// The stream must currently be at `expected_version`. On a match the
    /// events are appended in order, atomically, and the new version
    /// (`expected_version + events.len()`) is returned. The first append to a
    /// new stream uses `Version::INITIAL`, so two concurrent creations of the
    /// same stream cannot both succeed.
    ///
    /// Appending no events still checks the version and returns
    /// `expected_version` unchanged.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: Version mismatch; nothing was appended
    /// - `DatabaseError`: Storage backend failed
    /// - `SerializationError`: Failed to encode events
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use composable_es_core::event_store::EventStore;
    /// use composable_es_core::stream::{StreamId, Version};
    ///
    /// async fn append_example<E: EventStore>(store: &E) -> Result<(), Box<dyn std::error::Error>> {
    ///     let stream_id = StreamId::new("shopping_cart-123");
    ///     let events = vec![/* events */];
    ///
    ///     // First append to new stream
    ///     let v1 = store.append_events(stream_id.clone(), Version::INITIAL, events.clone()).await?;
    ///
    ///     // Subsequent append requires correct version
    ///     let v2 = store.append_events(stream_id, v1, events).await?;
    ///
    ///     Ok(())
    /// }
    /// ```
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>>;

    /// Load every event of a stream, oldest first, with the stream's version.
    ///
    /// A stream that doesn't exist reads as empty at version 0; callers that
    /// expected it to exist decide whether that is an error.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: Storage backend failed
    fn load_events(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<StreamEvents, EventStoreError>> + Send + '_>>;

    /// Load every recorded event across all streams in global commit order,
    /// starting at `from_position` (1-based, inclusive).
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: Storage backend failed
    fn load_all_events(
        &self,
        from_position: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RecordedEvent>, EventStoreError>> + Send + '_>>;
}
