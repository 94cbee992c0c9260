//! # Composable ES Core
//!
//! Core traits and types for building event-sourced aggregates with optimistic
//! concurrency and independently shaped read models.
//!
//! ## Core Concepts
//!
//! - **Event**: An immutable fact, tagged by kind ([`event::Event`])
//! - **Aggregate**: State rebuilt by folding events; commands either reject or
//!   record new events ([`aggregate::Aggregate`], [`aggregate::AggregateRoot`])
//! - **Event Store**: Append-only per-stream log with compare-and-append
//!   ([`event_store::EventStore`])
//! - **Projection**: Read model folded from the same events
//!   ([`projection::Projection`], [`projection::ProjectionStore`])
//! - **Errors**: One result type separating rejections, missing streams,
//!   conflicts and corrupted history ([`error::CommandError`])
//!
//! ## Architecture Principles
//!
//! - Events are the only source of truth
//! - Folding is pure and deterministic
//! - The store's compare-and-append is the only serialization point
//! - Stores are explicit objects, never ambient globals
//!
//! ## Example
//!
//! ```
//! use composable_es_core::aggregate::Aggregate;
//! use composable_es_core::event::Event;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum CounterEvent {
//!     Incremented { by: u32 },
//! }
//!
//! impl Event for CounterEvent {
//!     const EVENT_TYPES: &'static [&'static str] = &["Incremented.v1"];
//!
//!     fn event_type(&self) -> &'static str {
//!         "Incremented.v1"
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Counter {
//!     value: u32,
//! }
//!
//! impl Aggregate for Counter {
//!     type Event = CounterEvent;
//!     type Id = String;
//!     type Rejection = std::convert::Infallible;
//!
//!     const KIND: &'static str = "counter";
//!
//!     fn initial() -> Self {
//!         Self::default()
//!     }
//!
//!     fn apply(&mut self, event: &CounterEvent) {
//!         match event {
//!             CounterEvent::Incremented { by } => self.value += by,
//!         }
//!     }
//! }
//!
//! let events = vec![
//!     CounterEvent::Incremented { by: 2 },
//!     CounterEvent::Incremented { by: 3 },
//! ];
//! assert_eq!(Counter::replay(&events).value, 5);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod error;
pub mod event;
pub mod event_store;
pub mod projection;
pub mod stream;

/// Environment module - Dependency injection traits
///
/// External dependencies that influence decisions (currently only time) are
/// abstracted behind traits so aggregates stay deterministic under test.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use composable_es_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
