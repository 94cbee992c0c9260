//! # Composable ES Testing
//!
//! Testing utilities for event-sourced aggregates and their read models.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`FixedClock`])
//! - [`InMemoryEventStore`]: a conforming compare-and-append event store
//! - [`InMemoryProjectionStore`] and [`ProjectionTestHarness`] for read models
//! - [`AggregateTest`]: Given-When-Then testing for command behaviours
//!
//! ## Example
//!
//! ```ignore
//! use composable_es_testing::{InMemoryEventStore, test_clock};
//!
//! #[tokio::test]
//! async fn test_cart_flow() {
//!     let store = Arc::new(InMemoryEventStore::new().with_clock(Arc::new(test_clock())));
//!     let service = ShoppingCartService::new(
//!         store.clone(),
//!         Arc::new(read_models.engine()),
//!         prices,
//!         Arc::new(test_clock()),
//!     );
//!
//!     service.open(cart_id, client_id).await.unwrap();
//!     let stream = store.load_events(ShoppingCart::stream_id(&cart_id)).await.unwrap();
//!     assert_eq!(stream.version, Version::new(1));
//! }
//! ```

use chrono::{DateTime, Utc};
use composable_es_core::environment::Clock;

pub mod aggregate_test;
pub mod event_store_mocks;
pub mod projection_mocks;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_es_testing::mocks::FixedClock;
    /// use composable_es_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use aggregate_test::AggregateTest;
pub use event_store_mocks::InMemoryEventStore;
pub use mocks::{FixedClock, test_clock};
pub use projection_mocks::{InMemoryProjectionStore, ProjectionTestHarness};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
