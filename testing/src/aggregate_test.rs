//! Ergonomic testing utilities for aggregates
//!
//! This module provides a fluent API for testing command behaviours with
//! readable Given-When-Then syntax: given a history, when a behaviour runs,
//! then it records these events (or is rejected).

#![allow(clippy::module_name_repetitions)] // AggregateTest is the natural name

use composable_es_core::aggregate::{Aggregate, AggregateRoot};
use composable_es_core::stream::StreamId;

/// Type alias for the behaviour under test
type Behaviour<A> =
    Box<dyn FnOnce(&A) -> Result<<A as Aggregate>::Event, <A as Aggregate>::Rejection>>;

/// Type alias for state assertion functions
type StateAssertion<A> = Box<dyn FnOnce(&A)>;

/// Type alias for recorded-event assertion functions
type EventAssertion<A> = Box<dyn FnOnce(&[<A as Aggregate>::Event])>;

/// Type alias for rejection assertion functions
type RejectionAssertion<A> = Box<dyn FnOnce(&<A as Aggregate>::Rejection)>;

/// Fluent API for testing aggregates with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use composable_es_testing::AggregateTest;
///
/// AggregateTest::<ShoppingCart>::new()
///     .given(vec![opened(cart_id, client_id)])
///     .when(move |cart| cart.cancel(now))
///     .then_events(|events| {
///         assert!(matches!(events, [ShoppingCartEvent::Canceled { .. }]));
///     })
///     .then_state(|cart| {
///         assert!(cart.is_closed());
///     })
///     .run();
/// ```
pub struct AggregateTest<A: Aggregate> {
    history: Vec<A::Event>,
    behaviour: Option<Behaviour<A>>,
    state_assertions: Vec<StateAssertion<A>>,
    event_assertions: Vec<EventAssertion<A>>,
    rejection_assertions: Vec<RejectionAssertion<A>>,
}

impl<A: Aggregate> AggregateTest<A> {
    /// Create a new aggregate test starting from an empty history
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: Vec::new(),
            behaviour: None,
            state_assertions: Vec::new(),
            event_assertions: Vec::new(),
            rejection_assertions: Vec::new(),
        }
    }

    /// Set the prior history (Given)
    #[must_use]
    pub fn given(mut self, events: Vec<A::Event>) -> Self {
        self.history = events;
        self
    }

    /// Set the behaviour to run against the replayed state (When)
    #[must_use]
    pub fn when<F>(mut self, behaviour: F) -> Self
    where
        F: FnOnce(&A) -> Result<A::Event, A::Rejection> + 'static,
    {
        self.behaviour = Some(Box::new(behaviour));
        self
    }

    /// Add an assertion about the state after the behaviour (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&A) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the recorded events (Then)
    ///
    /// Implies the behaviour must succeed.
    #[must_use]
    pub fn then_events<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[A::Event]) + 'static,
    {
        self.event_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the rejection (Then)
    ///
    /// Implies the behaviour must be rejected.
    #[must_use]
    pub fn then_rejected<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&A::Rejection) + 'static,
    {
        self.rejection_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if no behaviour is set, if the outcome (accepted or rejected)
    /// differs from what the assertions expect, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let behaviour = self
            .behaviour
            .expect("Behaviour must be set with when()");

        let mut root = AggregateRoot::<A>::new(StreamId::new(A::KIND));
        for event in self.history {
            root.record(event);
        }
        root.take_pending();

        match root.execute(behaviour) {
            Ok(()) => {
                assert!(
                    self.rejection_assertions.is_empty(),
                    "Expected the behaviour to be rejected, but it recorded {:?}",
                    root.pending_events()
                );
                for assertion in self.event_assertions {
                    assertion(root.pending_events());
                }
            }
            Err(rejection) => {
                assert!(
                    self.event_assertions.is_empty(),
                    "Expected the behaviour to record events, but it was rejected: {rejection}"
                );
                assert!(
                    root.pending_events().is_empty(),
                    "A rejected behaviour must not record events"
                );
                for assertion in self.rejection_assertions {
                    assertion(&rejection);
                }
            }
        }

        for assertion in self.state_assertions {
            assertion(root.state());
        }
    }
}

impl<A: Aggregate> Default for AggregateTest<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_es_core::event::Event;
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    enum LampEvent {
        SwitchedOn,
        SwitchedOff,
    }

    impl Event for LampEvent {
        const EVENT_TYPES: &'static [&'static str] = &["SwitchedOn.v1", "SwitchedOff.v1"];

        fn event_type(&self) -> &'static str {
            match self {
                LampEvent::SwitchedOn => "SwitchedOn.v1",
                LampEvent::SwitchedOff => "SwitchedOff.v1",
            }
        }
    }

    #[derive(Debug, Error, PartialEq)]
    enum LampError {
        #[error("lamp is already on")]
        AlreadyOn,
    }

    #[derive(Clone, Debug, Default)]
    struct Lamp {
        on: bool,
    }

    impl Aggregate for Lamp {
        type Event = LampEvent;
        type Id = u8;
        type Rejection = LampError;

        const KIND: &'static str = "lamp";

        fn initial() -> Self {
            Self::default()
        }

        fn apply(&mut self, event: &LampEvent) {
            self.on = matches!(event, LampEvent::SwitchedOn);
        }
    }

    fn switch_on(lamp: &Lamp) -> Result<LampEvent, LampError> {
        if lamp.on {
            Err(LampError::AlreadyOn)
        } else {
            Ok(LampEvent::SwitchedOn)
        }
    }

    #[test]
    fn accepted_behaviour_records_one_event() {
        AggregateTest::<Lamp>::new()
            .given(vec![LampEvent::SwitchedOn, LampEvent::SwitchedOff])
            .when(switch_on)
            .then_events(|events| assert_eq!(events, [LampEvent::SwitchedOn]))
            .then_state(|lamp| assert!(lamp.on))
            .run();
    }

    #[test]
    fn rejected_behaviour_keeps_the_state() {
        AggregateTest::<Lamp>::new()
            .given(vec![LampEvent::SwitchedOn])
            .when(switch_on)
            .then_rejected(|error| assert_eq!(error, &LampError::AlreadyOn))
            .then_state(|lamp| assert!(lamp.on))
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected the behaviour to be rejected")]
    fn expecting_a_rejection_that_does_not_happen_fails() {
        AggregateTest::<Lamp>::new()
            .when(switch_on)
            .then_rejected(|_| {})
            .run();
    }
}
