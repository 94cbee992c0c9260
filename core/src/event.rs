//! Event trait and the stored representations of events.
//!
//! Events are immutable facts. Every aggregate declares its event kinds as one
//! closed Rust enum; the enum implements [`Event`] and lists every kind it can
//! produce in [`Event::EVENT_TYPES`], so a stored record whose kind is not in
//! that list is detected as corrupted history instead of being silently
//! skipped.
//!
//! # Design
//!
//! Events are serialized with `bincode` into a [`SerializedEvent`], the wire
//! format between aggregates and stores. Once a store accepts an event it wraps
//! it in a [`RecordedEvent`] carrying the stream, the per-stream version and the
//! global commit position.
//!
//! # Example
//!
//! ```
//! use composable_es_core::event::{Event, SerializedEvent};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! enum OrderEvent {
//!     OrderPlaced { order_id: String, total: u64 },
//!     OrderShipped { order_id: String },
//! }
//!
//! impl Event for OrderEvent {
//!     const EVENT_TYPES: &'static [&'static str] = &["OrderPlaced.v1", "OrderShipped.v1"];
//!
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             OrderEvent::OrderPlaced { .. } => "OrderPlaced.v1",
//!             OrderEvent::OrderShipped { .. } => "OrderShipped.v1",
//!         }
//!     }
//! }
//!
//! let event = OrderEvent::OrderShipped { order_id: "o-1".into() };
//! let serialized = SerializedEvent::from_event(&event).unwrap();
//! assert_eq!(serialized.event_type, "OrderShipped.v1");
//! ```

use crate::stream::{StreamId, Version};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// A stored event carries a kind this event type does not know.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The payload decoded to a different kind than the one recorded with it.
    #[error("Event type mismatch: recorded as {recorded}, payload decodes as {decoded}")]
    TypeMismatch {
        /// Kind stored next to the payload.
        recorded: String,
        /// Kind the payload actually decoded to.
        decoded: &'static str,
    },
}

/// A domain event that can be stored and replayed.
///
/// # Event Naming Convention
///
/// `event_type()` returns a stable identifier with a version suffix, for
/// example `"ShoppingCartOpened.v1"`. The same strings must be listed in
/// [`Event::EVENT_TYPES`].
///
/// # Serialization
///
/// Default `to_bytes`/`from_bytes` implementations use `bincode` for any type
/// implementing `Serialize` and `DeserializeOwned`.
pub trait Event: Send + Sync + 'static {
    /// Every kind this event type can produce.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the kind identifier of this event.
    fn event_type(&self) -> &'static str;

    /// Whether `event_type` is one of the kinds listed in [`Event::EVENT_TYPES`].
    #[must_use]
    fn is_known_type(event_type: &str) -> bool
    where
        Self: Sized,
    {
        Self::EVENT_TYPES.contains(&event_type)
    }

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to a different event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready to be appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedEvent {
    /// The event kind identifier (e.g., "ShoppingCartOpened.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Serialize a domain event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }

    /// Decode the payload back into a domain event.
    ///
    /// The recorded kind is checked against [`Event::EVENT_TYPES`] before the
    /// payload is decoded, and against the decoded value afterwards.
    ///
    /// # Errors
    ///
    /// - `UnknownEventType` if the recorded kind is not part of `E`
    /// - `DeserializationError` if the payload is corrupted
    /// - `TypeMismatch` if the payload decodes to another kind
    pub fn decode<E>(&self) -> Result<E, EventError>
    where
        E: Event + DeserializeOwned,
    {
        if !E::is_known_type(&self.event_type) {
            return Err(EventError::UnknownEventType(self.event_type.clone()));
        }

        let event = E::from_bytes(&self.data)?;
        if event.event_type() != self.event_type {
            return Err(EventError::TypeMismatch {
                recorded: self.event_type.clone(),
                decoded: event.event_type(),
            });
        }
        Ok(event)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

/// An event as committed by an event store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Stream the event belongs to.
    pub stream_id: StreamId,

    /// Version of the stream once this event was appended (1 for the first event).
    pub version: Version,

    /// 1-based position of this event in the store-wide commit order.
    pub position: u64,

    /// When the store accepted the event.
    pub recorded_at: DateTime<Utc>,

    /// The stored kind and payload.
    pub event: SerializedEvent,
}

impl RecordedEvent {
    /// Decode the stored payload. See [`SerializedEvent::decode`].
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] if the kind is unknown or the payload is corrupted.
    pub fn decode<E>(&self) -> Result<E, EventError>
    where
        E: Event + DeserializeOwned,
    {
        self.event.decode()
    }
}
