//! Aggregates: state folded from events, mutated only by recording new events.
//!
//! An [`Aggregate`] is a plain value with one transition function,
//! [`Aggregate::apply`]. Current state is never stored; it is rebuilt by
//! replaying the stream from [`Aggregate::initial`]. Commands run against an
//! [`AggregateRoot`], which wraps the replayed state together with the version
//! it was loaded at and the events recorded since.
//!
//! # Unit of work
//!
//! ```text
//! load (store read) ──► replay ──► execute behaviours ──► append(expected = loaded version)
//!                                      │
//!                                      └─ each accepted behaviour records one event
//!                                         and applies it immediately
//! ```
//!
//! An `AggregateRoot` lives for one unit of work and is discarded afterwards.

use crate::event::{Event, EventError};
use crate::event_store::StreamEvents;
use crate::stream::{StreamId, Version};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// State rebuilt by folding an ordered sequence of events.
///
/// `apply` must be a pure, total function over the aggregate's closed event
/// set; it is the only code path that changes state, whether an event comes
/// from history or was just recorded by a command.
pub trait Aggregate: Clone + Send + Sync + 'static {
    /// The closed set of events this aggregate is folded from.
    type Event: Event + Clone + fmt::Debug + Serialize + DeserializeOwned;

    /// Identity of one aggregate instance.
    type Id: fmt::Display + Send + Sync;

    /// Business-rule rejection returned by command behaviours.
    type Rejection: std::error::Error + Send + Sync + 'static;

    /// Aggregate kind, used as the stream ID prefix.
    const KIND: &'static str;

    /// Zero state before any event has been applied.
    fn initial() -> Self;

    /// Apply one event in place.
    fn apply(&mut self, event: &Self::Event);

    /// By-value fold step over [`Aggregate::apply`].
    #[must_use]
    fn fold(mut self, event: &Self::Event) -> Self {
        self.apply(event);
        self
    }

    /// Left fold of `events` from [`Aggregate::initial`].
    #[must_use]
    fn replay<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a Self::Event>,
    {
        events.into_iter().fold(Self::initial(), Self::fold)
    }

    /// Stream holding the history of the instance identified by `id`.
    #[must_use]
    fn stream_id(id: &Self::Id) -> StreamId {
        StreamId::for_aggregate(Self::KIND, id)
    }
}

/// One aggregate instance loaded for a unit of work.
///
/// Holds the replayed state, the stream version it was loaded at (the expected
/// version for the next append) and the events recorded since loading.
#[derive(Clone, Debug)]
pub struct AggregateRoot<A: Aggregate> {
    stream_id: StreamId,
    state: A,
    version: Version,
    pending: Vec<A::Event>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A root for a stream that has no events yet.
    #[must_use]
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            state: A::initial(),
            version: Version::INITIAL,
            pending: Vec::new(),
        }
    }

    /// Rebuild a root from a stream read.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] if a stored event has a kind `A` does not know or
    /// its payload cannot be decoded. Such history is corrupted and must not be
    /// folded past.
    pub fn rehydrate(stream_id: StreamId, stream: &StreamEvents) -> Result<Self, EventError> {
        let mut state = A::initial();
        for recorded in &stream.events {
            let event: A::Event = recorded.decode()?;
            state.apply(&event);
        }

        Ok(Self {
            stream_id,
            state,
            version: stream.version,
            pending: Vec::new(),
        })
    }

    /// Stream this root reads from and appends to.
    #[must_use]
    pub const fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Current state, including events recorded but not yet committed.
    #[must_use]
    pub const fn state(&self) -> &A {
        &self.state
    }

    /// Version the stream was at when this root was loaded or last committed.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Whether the stream had any events when loaded.
    #[must_use]
    pub const fn exists(&self) -> bool {
        !self.version.is_initial()
    }

    /// Events recorded since the last commit, oldest first.
    #[must_use]
    pub fn pending_events(&self) -> &[A::Event] {
        &self.pending
    }

    /// Whether any event is waiting to be appended.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record an event: apply it to the state and queue it for append.
    pub fn record(&mut self, event: A::Event) {
        self.state.apply(&event);
        self.pending.push(event);
    }

    /// Run one command behaviour against the current state.
    ///
    /// On success the produced event is recorded, so later behaviours in the
    /// same unit of work see it. On rejection nothing changes.
    ///
    /// # Errors
    ///
    /// Returns the behaviour's rejection unchanged.
    pub fn execute<F>(&mut self, behaviour: F) -> Result<(), A::Rejection>
    where
        F: FnOnce(&A) -> Result<A::Event, A::Rejection>,
    {
        let event = behaviour(&self.state)?;
        self.record(event);
        Ok(())
    }

    /// Remove and return the pending events, leaving the version untouched.
    pub fn take_pending(&mut self) -> Vec<A::Event> {
        std::mem::take(&mut self.pending)
    }

    /// Record that the store accepted the pending events and is now at `version`.
    pub fn mark_committed(&mut self, version: Version) {
        self.pending.clear();
        self.version = version;
    }

    /// Consume the root, keeping only the state.
    #[must_use]
    pub fn into_state(self) -> A {
        self.state
    }
}
