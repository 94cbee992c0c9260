//! `ProjectionEngine` for keeping read models in step with the event store.
//!
//! # Overview
//!
//! The engine owns the set of projections fed by one event type:
//! - Receives newly committed events from the command handler and dispatches
//!   them to each projection, in registration order
//! - Rebuilds every projection from scratch by replaying the store's global log
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  append ok   ┌──────────────────┐
//! │CommandHandler│ ───────────► │ ProjectionEngine │
//! └──────────────┘  new events  └───┬──────────┬───┘
//!                                   │          │
//!                                   ▼          ▼
//!                             ┌──────────┐ ┌──────────┐
//!                             │Projection│ │Projection│
//!                             └──────────┘ └──────────┘
//! ```
//!
//! # Delivery
//!
//! Delivery is in-process and synchronous: `handle` returns once every
//! projection has applied the event. The first projection error stops
//! dispatch and is returned to the caller unchanged.

use composable_es_core::event::Event;
use composable_es_core::event_store::EventStore;
use composable_es_core::projection::{Projection, ProjectionError, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Object-safe view of a [`Projection`], so projections of different concrete
/// types can be held in one list.
trait DynProjection<E>: Send + Sync {
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<()>>;

    fn clear(&self) -> BoxFuture<'_, Result<()>>;
}

impl<P> DynProjection<P::Event> for P
where
    P: Projection,
{
    fn name(&self) -> &str {
        Projection::name(self)
    }

    fn apply<'a>(&'a self, event: &'a P::Event) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.apply_event(event))
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.rebuild())
    }
}

/// Summary of a completed rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Number of projections cleared and replayed.
    pub projections: usize,
    /// Number of events replayed into them.
    pub events: usize,
}

/// Dispatches events of type `E` to a set of projections.
///
/// # Example
///
/// ```ignore
/// let engine = ProjectionEngine::new()
///     .with_stream_category("shopping_cart")
///     .with_projection(details)
///     .with_projection(short_info);
///
/// engine.handle(&event).await?;
/// ```
pub struct ProjectionEngine<E> {
    projections: Vec<Arc<dyn DynProjection<E>>>,
    /// Stream ID prefix (`"{category}-"`) of the streams replayed on rebuild
    stream_prefix: Option<String>,
}

impl<E> ProjectionEngine<E>
where
    E: Event + DeserializeOwned,
{
    /// Create an engine with no projections, replaying every stream on rebuild.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            projections: Vec::new(),
            stream_prefix: None,
        }
    }

    /// Limit rebuilds to streams of one aggregate kind.
    ///
    /// The global log holds every aggregate's events; only streams named
    /// `"{category}-..."` carry events of type `E`.
    #[must_use]
    pub fn with_stream_category(mut self, category: &str) -> Self {
        self.stream_prefix = Some(format!("{category}-"));
        self
    }

    /// Register a projection (builder style).
    #[must_use]
    pub fn with_projection<P>(mut self, projection: P) -> Self
    where
        P: Projection<Event = E> + 'static,
    {
        self.register(projection);
        self
    }

    /// Register a projection.
    pub fn register<P>(&mut self, projection: P)
    where
        P: Projection<Event = E> + 'static,
    {
        tracing::debug!(projection = Projection::name(&projection), "Registered projection");
        self.projections.push(Arc::new(projection));
    }

    /// Names of the registered projections, in dispatch order.
    #[must_use]
    pub fn projection_names(&self) -> Vec<&str> {
        self.projections.iter().map(|p| p.name()).collect()
    }

    /// Number of registered projections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projections.len()
    }

    /// Whether no projection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }

    /// Apply one event to every projection.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProjectionError`] raised; later projections do not
    /// see the event.
    pub async fn handle(&self, event: &E) -> Result<()> {
        for projection in &self.projections {
            tracing::debug!(
                projection = projection.name(),
                event_type = event.event_type(),
                "Dispatching event"
            );
            projection.apply(event).await?;
        }
        Ok(())
    }

    /// Apply events, oldest first, to every projection.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProjectionError`] raised.
    pub async fn handle_all(&self, events: &[E]) -> Result<()> {
        for event in events {
            self.handle(event).await?;
        }
        Ok(())
    }

    /// Clear every projection and replay the store's global log into them.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if:
    /// - A projection cannot be cleared
    /// - The global log cannot be read
    /// - A recorded event cannot be decoded as `E`
    /// - A projection fails to apply an event
    pub async fn rebuild(&self, store: &dyn EventStore) -> Result<RebuildReport> {
        tracing::info!(projections = self.len(), "Rebuilding projections");

        for projection in &self.projections {
            projection.clear().await?;
        }

        let recorded = store
            .load_all_events(1)
            .await
            .map_err(|e| ProjectionError::EventProcessing(format!("Failed to read event log: {e}")))?;

        let mut events = 0;
        for record in recorded.iter().filter(|r| self.replays(r.stream_id.as_str())) {
            let event: E = record.decode().map_err(|e| {
                ProjectionError::Serialization(format!(
                    "Failed to decode event {} at position {}: {e}",
                    record.event.event_type, record.position
                ))
            })?;
            self.handle(&event).await?;
            events += 1;
        }

        let report = RebuildReport {
            projections: self.len(),
            events,
        };
        tracing::info!(
            projections = report.projections,
            events = report.events,
            "Projections rebuilt"
        );
        Ok(report)
    }

    fn replays(&self, stream_id: &str) -> bool {
        self.stream_prefix
            .as_deref()
            .is_none_or(|prefix| stream_id.starts_with(prefix))
    }
}

impl<E> Default for ProjectionEngine<E>
where
    E: Event + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ProjectionEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionEngine")
            .field(
                "projections",
                &self.projections.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("stream_prefix", &self.stream_prefix)
            .finish()
    }
}
