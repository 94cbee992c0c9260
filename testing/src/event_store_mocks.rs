//! In-memory event store.
//!
//! [`InMemoryEventStore`] keeps every stream in a `HashMap` plus one global log
//! in commit order. Appends are checked and applied under a single write lock,
//! which is what makes compare-and-append atomic here.

use chrono::{DateTime, Utc};
use composable_es_core::environment::{Clock, SystemClock};
use composable_es_core::event::{RecordedEvent, SerializedEvent};
use composable_es_core::event_store::{EventStore, EventStoreError, StreamEvents};
use composable_es_core::stream::{StreamId, Version};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    /// Global positions (indices into `log`) of each stream's events, in order.
    streams: HashMap<StreamId, Vec<usize>>,
    log: Vec<RecordedEvent>,
}

impl Inner {
    fn version_of(&self, stream_id: &StreamId) -> Version {
        self.streams
            .get(stream_id)
            .map_or(Version::INITIAL, |indices| Version::INITIAL.advanced_by(indices.len()))
    }
}

/// Thread-safe in-memory implementation of [`EventStore`].
///
/// Cloning the store shares the underlying data.
///
/// # Example
///
/// ```
/// use composable_es_core::event::SerializedEvent;
/// use composable_es_core::event_store::EventStore;
/// use composable_es_core::stream::{StreamId, Version};
/// use composable_es_testing::InMemoryEventStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryEventStore::new();
/// let stream = StreamId::new("cart-1");
/// let event = SerializedEvent::new("Opened.v1".into(), vec![1]);
///
/// let v1 = store.append_events(stream.clone(), Version::INITIAL, vec![event.clone()]).await?;
/// assert_eq!(v1, Version::new(1));
///
/// // A second writer that also read version 0 loses
/// let err = store.append_events(stream, Version::INITIAL, vec![event]).await.unwrap_err();
/// assert!(err.is_conflict());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryEventStore {
    /// Create an empty store stamping events with the system time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for the `recorded_at` timestamp of appended events.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of streams with at least one event.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.read().map_or(0, |inner| inner.streams.len())
    }

    /// Total number of events across all streams.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.read().map_or(0, |inner| inner.log.len())
    }

    /// Current version of `stream_id` (0 if it has no events).
    #[must_use]
    pub fn stream_version(&self, stream_id: &StreamId) -> Version {
        self.read()
            .map_or(Version::INITIAL, |inner| inner.version_of(stream_id))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, EventStoreError> {
        self.inner
            .read()
            .map_err(|_| EventStoreError::DatabaseError("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, EventStoreError> {
        self.inner
            .write()
            .map_err(|_| EventStoreError::DatabaseError("in-memory store lock poisoned".to_string()))
    }

    fn append(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Version, EventStoreError> {
        let mut inner = self.write()?;

        let actual = inner.version_of(&stream_id);
        if actual != expected_version {
            tracing::debug!(
                stream_id = %stream_id,
                expected = %expected_version,
                actual = %actual,
                "Rejected append: version conflict"
            );
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected: expected_version,
                actual,
            });
        }

        if events.is_empty() {
            return Ok(actual);
        }

        let count = events.len();
        let mut version = actual;
        let mut indices = Vec::with_capacity(count);
        for event in events {
            version = version.next();
            let index = inner.log.len();
            inner.log.push(RecordedEvent {
                stream_id: stream_id.clone(),
                version,
                position: index as u64 + 1,
                recorded_at,
                event,
            });
            indices.push(index);
        }
        inner.streams.entry(stream_id.clone()).or_default().extend(indices);
        drop(inner);

        tracing::debug!(
            stream_id = %stream_id,
            events = count,
            version = %version,
            "Appended events"
        );
        Ok(version)
    }

    fn load(&self, stream_id: &StreamId) -> Result<StreamEvents, EventStoreError> {
        let inner = self.read()?;
        let events: Vec<RecordedEvent> = inner
            .streams
            .get(stream_id)
            .map(|indices| indices.iter().map(|&i| inner.log[i].clone()).collect())
            .unwrap_or_default();
        let version = Version::INITIAL.advanced_by(events.len());
        Ok(StreamEvents { events, version })
    }

    fn load_all(&self, from_position: u64) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let inner = self.read()?;
        let skip = usize::try_from(from_position.saturating_sub(1)).unwrap_or(usize::MAX);
        Ok(inner.log.iter().skip(skip).cloned().collect())
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("streams", &self.stream_count())
            .field("events", &self.event_count())
            .finish_non_exhaustive()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        let recorded_at = self.clock.now();
        Box::pin(async move { self.append(stream_id, expected_version, events, recorded_at) })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<StreamEvents, EventStoreError>> + Send + '_>> {
        Box::pin(async move { self.load(&stream_id) })
    }

    fn load_all_events(
        &self,
        from_position: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RecordedEvent>, EventStoreError>> + Send + '_>> {
        Box::pin(async move { self.load_all(from_position) })
    }
}
