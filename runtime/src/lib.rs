//! # Composable ES Runtime
//!
//! Runtime for event-sourced aggregates.
//!
//! This crate provides the command handler that turns a command into a
//! committed stream append, and the caller-side retry helpers for commands
//! that lost a version race.
//!
//! ## Core Components
//!
//! - **`CommandHandler`**: load → replay → decide → compare-and-append →
//!   project, one unit of work per command
//! - **Retry**: `retry_on_conflict` re-runs a whole unit of work after a
//!   concurrency conflict; the handler itself never retries
//!
//! ## Example
//!
//! ```ignore
//! use composable_es_runtime::CommandHandler;
//!
//! let handler = CommandHandler::<ShoppingCart>::new(event_store, projections);
//!
//! // Create a stream
//! handler
//!     .create(&cart_id, |root| root.execute(|cart| cart.open(cart_id, client_id, now)))
//!     .await?;
//!
//! // Update it, asserting the version the client last saw
//! handler
//!     .update(&cart_id, Some(seen_version), |root| root.execute(|cart| cart.confirm(now)))
//!     .await?;
//! ```

/// Retry logic with exponential backoff
pub mod retry;

/// Command handling
pub mod handler {
    use composable_es_core::aggregate::{Aggregate, AggregateRoot};
    use composable_es_core::error::{CommandError, CommandResult};
    use composable_es_core::event::SerializedEvent;
    use composable_es_core::event_store::{EventStore, EventStoreError};
    use composable_es_core::stream::{StreamId, Version};
    use composable_es_projections::ProjectionEngine;
    use std::sync::Arc;

    /// Result of a committed command.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct CommandOutcome<E> {
        /// Stream the command targeted.
        pub stream_id: StreamId,
        /// Stream version after the command; the next expected version.
        pub version: Version,
        /// Events appended by the command, oldest first.
        pub events: Vec<E>,
    }

    impl<E> CommandOutcome<E> {
        /// Whether the command appended nothing.
        #[must_use]
        pub fn is_noop(&self) -> bool {
            self.events.is_empty()
        }
    }

    /// Executes commands against one aggregate type.
    ///
    /// Each command is a unit of work:
    ///
    /// 1. Read the stream and replay it into an [`AggregateRoot`]
    /// 2. Run the behaviours, which record events or reject
    /// 3. Append the recorded events, expecting the version read in step 1
    /// 4. Forward the appended events to the projection engine
    ///
    /// No lock is held between steps 1 and 3. If another writer appended in
    /// between, step 3 fails with [`CommandError::ConcurrencyConflict`] and
    /// nothing is written; the handler does not retry.
    ///
    /// # Thread Safety
    ///
    /// The handler is cheap to clone and can be shared across tasks; different
    /// streams never interact.
    pub struct CommandHandler<A: Aggregate> {
        store: Arc<dyn EventStore>,
        projections: Arc<ProjectionEngine<A::Event>>,
    }

    impl<A: Aggregate> Clone for CommandHandler<A> {
        fn clone(&self) -> Self {
            Self {
                store: Arc::clone(&self.store),
                projections: Arc::clone(&self.projections),
            }
        }
    }

    impl<A: Aggregate> std::fmt::Debug for CommandHandler<A> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CommandHandler")
                .field("aggregate", &A::KIND)
                .field("projections", &self.projections)
                .finish_non_exhaustive()
        }
    }

    impl<A: Aggregate> CommandHandler<A> {
        /// Create a handler appending to `store` and feeding `projections`.
        #[must_use]
        pub fn new(store: Arc<dyn EventStore>, projections: Arc<ProjectionEngine<A::Event>>) -> Self {
            Self { store, projections }
        }

        /// Create a handler with no projections.
        #[must_use]
        pub fn without_projections(store: Arc<dyn EventStore>) -> Self {
            Self::new(store, Arc::new(ProjectionEngine::new()))
        }

        /// The event store this handler appends to.
        #[must_use]
        pub const fn store(&self) -> &Arc<dyn EventStore> {
            &self.store
        }

        /// The projections fed after each successful append.
        #[must_use]
        pub const fn projections(&self) -> &Arc<ProjectionEngine<A::Event>> {
            &self.projections
        }

        /// Read and replay the stream of `id`.
        ///
        /// A stream with no events loads as the initial state at version 0.
        ///
        /// # Errors
        ///
        /// - [`CommandError::Inconsistency`] if the history holds an event the
        ///   aggregate cannot decode
        /// - [`CommandError::Store`] if the store fails
        #[tracing::instrument(skip(self, id), fields(kind = A::KIND, id = %id), name = "command_load")]
        pub async fn load(&self, id: &A::Id) -> CommandResult<AggregateRoot<A>, A::Rejection> {
            let stream_id = A::stream_id(id);
            let stream = self.store.load_events(stream_id.clone()).await?;
            let root = AggregateRoot::rehydrate(stream_id, &stream).map_err(|e| {
                tracing::error!(error = %e, "Stored history cannot be replayed");
                CommandError::from(e)
            })?;
            tracing::debug!(version = %root.version(), "Loaded aggregate");
            Ok(root)
        }

        /// Read and replay the stream of `id`, which must exist.
        ///
        /// # Errors
        ///
        /// [`CommandError::NotFound`] if the stream has no events, otherwise
        /// as [`CommandHandler::load`].
        pub async fn load_existing(&self, id: &A::Id) -> CommandResult<AggregateRoot<A>, A::Rejection> {
            let root = self.load(id).await?;
            if !root.exists() {
                tracing::debug!(stream_id = %root.stream_id(), "Stream not found");
                return Err(CommandError::NotFound(root.stream_id().clone()));
            }
            Ok(root)
        }

        /// Append the root's pending events and project them.
        ///
        /// The append expects the version the root was loaded at. With no
        /// pending events nothing is appended and nothing is projected.
        ///
        /// # Errors
        ///
        /// - [`CommandError::ConcurrencyConflict`] if the stream moved since
        ///   the root was loaded; the root keeps its pending events
        /// - [`CommandError::Store`] if the store fails
        /// - [`CommandError::Projection`] or [`CommandError::Inconsistency`] if
        ///   a projection fails after the append
        #[tracing::instrument(
            skip(self, root),
            fields(stream_id = %root.stream_id(), expected = %root.version()),
            name = "command_commit"
        )]
        pub async fn commit(
            &self,
            root: &mut AggregateRoot<A>,
        ) -> CommandResult<CommandOutcome<A::Event>, A::Rejection> {
            if !root.has_pending_events() {
                tracing::debug!("No events to append");
                return Ok(CommandOutcome {
                    stream_id: root.stream_id().clone(),
                    version: root.version(),
                    events: Vec::new(),
                });
            }

            let events = root.pending_events().to_vec();
            let serialized = events
                .iter()
                .map(SerializedEvent::from_event)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CommandError::Store(EventStoreError::SerializationError(e.to_string())))?;

            let version = match self
                .store
                .append_events(root.stream_id().clone(), root.version(), serialized)
                .await
            {
                Ok(version) => version,
                Err(error) => {
                    if error.is_conflict() {
                        tracing::warn!(error = %error, "Append rejected: stream moved since load");
                    } else {
                        tracing::error!(error = %error, "Append failed");
                    }
                    return Err(error.into());
                }
            };
            root.mark_committed(version);

            tracing::info!(events = events.len(), version = %version, "Committed events");

            self.projections.handle_all(&events).await.map_err(|e| {
                tracing::error!(error = %e, "Projection failed after append");
                CommandError::from(e)
            })?;

            Ok(CommandOutcome {
                stream_id: root.stream_id().clone(),
                version,
                events,
            })
        }

        /// Run a command that may start a new stream.
        ///
        /// `decide` sees the replayed state, which is the initial state when
        /// the stream does not exist yet. Two concurrent creations of the same
        /// stream both expect version 0; only one append succeeds.
        ///
        /// # Errors
        ///
        /// [`CommandError::Validation`] with `decide`'s rejection, otherwise as
        /// [`CommandHandler::load`] and [`CommandHandler::commit`].
        pub async fn create<F>(
            &self,
            id: &A::Id,
            decide: F,
        ) -> CommandResult<CommandOutcome<A::Event>, A::Rejection>
        where
            F: FnOnce(&mut AggregateRoot<A>) -> Result<(), A::Rejection> + Send,
        {
            let mut root = self.load(id).await?;
            run(&mut root, decide)?;
            self.commit(&mut root).await
        }

        /// Run a command against an existing stream.
        ///
        /// When `expected` is given it is the version the caller observed on
        /// an earlier read; if the stream has moved past it the command fails
        /// with a conflict before `decide` runs.
        ///
        /// # Errors
        ///
        /// - [`CommandError::NotFound`] if the stream has no events
        /// - [`CommandError::ConcurrencyConflict`] if `expected` is stale, or
        ///   if the stream moves between load and append
        /// - [`CommandError::Validation`] with `decide`'s rejection
        /// - otherwise as [`CommandHandler::load`] and [`CommandHandler::commit`]
        pub async fn update<F>(
            &self,
            id: &A::Id,
            expected: Option<Version>,
            decide: F,
        ) -> CommandResult<CommandOutcome<A::Event>, A::Rejection>
        where
            F: FnOnce(&mut AggregateRoot<A>) -> Result<(), A::Rejection> + Send,
        {
            let mut root = self.load_existing(id).await?;

            if let Some(expected) = expected {
                if expected != root.version() {
                    tracing::warn!(
                        stream_id = %root.stream_id(),
                        expected = %expected,
                        actual = %root.version(),
                        "Caller's version is stale"
                    );
                    return Err(CommandError::ConcurrencyConflict {
                        stream_id: root.stream_id().clone(),
                        expected,
                        actual: root.version(),
                    });
                }
            }

            run(&mut root, decide)?;
            self.commit(&mut root).await
        }
    }

    fn run<A, F>(root: &mut AggregateRoot<A>, decide: F) -> CommandResult<(), A::Rejection>
    where
        A: Aggregate,
        F: FnOnce(&mut AggregateRoot<A>) -> Result<(), A::Rejection>,
    {
        decide(root).map_err(|rejection| {
            tracing::warn!(
                stream_id = %root.stream_id(),
                version = %root.version(),
                error = %rejection,
                "Command rejected"
            );
            CommandError::Validation(rejection)
        })
    }
}

// Re-export main types for convenience
pub use handler::{CommandHandler, CommandOutcome};
pub use retry::{RetryPolicy, retry_on_conflict};
