//! Projection engine and read-model helpers for Composable ES.
//!
//! # Overview
//!
//! This crate drives the read side:
//! - **[`ProjectionEngine`]**: Dispatches committed events to every registered
//!   projection, in commit order, and rebuilds them from the store's global log
//! - **[`ReadModelTable`]**: Typed, bincode-encoded rows on top of any
//!   [`ProjectionStore`](composable_es_core::projection::ProjectionStore)
//!
//! # Building Projections
//!
//! ```ignore
//! use composable_es_projections::{ProjectionEngine, ReadModelTable};
//!
//! let engine = ProjectionEngine::new()
//!     .with_stream_category("shopping_cart")
//!     .with_projection(CartDetailsProjection::new(store.clone()))
//!     .with_projection(ClientSummaryProjection::new(store.clone()));
//!
//! // Incremental: called by the command handler after each append
//! engine.handle_all(&new_events).await?;
//!
//! // From scratch: clear every projection and replay the global log
//! engine.rebuild(event_store.as_ref()).await?;
//! ```

pub mod engine;
pub mod table;

// Re-export main types for convenience
pub use engine::{ProjectionEngine, RebuildReport};
pub use table::ReadModelTable;
