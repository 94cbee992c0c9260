//! Read models derived from shopping cart events.
//!
//! Three independently shaped views share one projection store, each under its
//! own key prefix:
//!
//! - [`ShoppingCartDetails`] (`cart_details:{cart}`): the full cart
//! - [`ShoppingCartShortInfo`] (`cart_short_info:{cart}`): totals of pending carts only
//! - [`ClientShoppingSummary`] (`client_summary:{client}`): per-client counts and
//!   amounts, routed through `client_cart:{cart}` index rows
//!
//! All three are rebuilt from the event log with
//! [`ProjectionEngine::rebuild`](composable_es_projections::ProjectionEngine::rebuild).

pub mod client_summary;
pub mod details;
pub mod short_info;

pub use client_summary::{ClientCart, ClientShoppingSummary, ClientShoppingSummaryProjection};
pub use details::{ShoppingCartDetails, ShoppingCartDetailsProjection};
pub use short_info::{ShoppingCartShortInfo, ShoppingCartShortInfoProjection};

use crate::cart::ShoppingCart;
use crate::events::ShoppingCartEvent;
use crate::types::{ClientId, ShoppingCartId};
use composable_es_core::aggregate::Aggregate;
use composable_es_core::projection::{ProjectionError, ProjectionStore, Result};
use composable_es_projections::{ProjectionEngine, ReadModelTable};
use std::fmt;
use std::sync::Arc;

/// The row stored under `key` cannot hold the totals an event adds up to.
fn overflow(key: &str) -> ProjectionError {
    ProjectionError::EventProcessing(format!("Totals of {key} overflow"))
}

/// The row stored under `key` holds less than an event takes out of it.
fn contradiction(key: &str, detail: impl fmt::Display) -> ProjectionError {
    ProjectionError::Contradiction(format!("{key}: {detail}"))
}

/// Query side of the shopping cart read models.
///
/// # Example
///
/// ```ignore
/// let read_models = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
/// let engine = Arc::new(read_models.engine());
///
/// // ... run commands through a service built with `engine` ...
///
/// let details = read_models.details(&cart_id).await?;
/// ```
pub struct ShoppingCartReadModels<S> {
    store: Arc<S>,
    details: ReadModelTable<S, ShoppingCartDetails>,
    short_info: ReadModelTable<S, ShoppingCartShortInfo>,
    summaries: ReadModelTable<S, ClientShoppingSummary>,
}

impl<S> ShoppingCartReadModels<S>
where
    S: ProjectionStore + 'static,
{
    /// Read models stored in `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            details: ReadModelTable::new(Arc::clone(&store), details::PREFIX),
            short_info: ReadModelTable::new(Arc::clone(&store), short_info::PREFIX),
            summaries: ReadModelTable::new(Arc::clone(&store), client_summary::PREFIX),
            store,
        }
    }

    /// The backing projection store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// An engine with every cart projection registered, rebuilding from
    /// shopping cart streams only.
    #[must_use]
    pub fn engine(&self) -> ProjectionEngine<ShoppingCartEvent> {
        ProjectionEngine::new()
            .with_stream_category(ShoppingCart::KIND)
            .with_projection(ShoppingCartDetailsProjection::new(Arc::clone(&self.store)))
            .with_projection(ShoppingCartShortInfoProjection::new(Arc::clone(&self.store)))
            .with_projection(ClientShoppingSummaryProjection::new(Arc::clone(&self.store)))
    }

    /// Details of a cart.
    ///
    /// # Errors
    ///
    /// Returns a [`ProjectionError`](composable_es_core::projection::ProjectionError)
    /// if the store fails or the row cannot be decoded.
    pub async fn details(&self, cart_id: &ShoppingCartId) -> Result<Option<ShoppingCartDetails>> {
        self.details.load(cart_id).await
    }

    /// Short info of a pending cart; `None` once the cart is closed.
    ///
    /// # Errors
    ///
    /// As [`ShoppingCartReadModels::details`].
    pub async fn short_info(&self, cart_id: &ShoppingCartId) -> Result<Option<ShoppingCartShortInfo>> {
        self.short_info.load(cart_id).await
    }

    /// Summary of a client's carts.
    ///
    /// # Errors
    ///
    /// As [`ShoppingCartReadModels::details`].
    pub async fn client_summary(&self, client_id: &ClientId) -> Result<Option<ClientShoppingSummary>> {
        self.summaries.load(client_id).await
    }
}

impl<S> std::fmt::Debug for ShoppingCartReadModels<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShoppingCartReadModels").finish_non_exhaustive()
    }
}
