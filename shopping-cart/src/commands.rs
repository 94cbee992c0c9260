//! Shopping cart commands and the service that executes them.
//!
//! The service is the application-facing edge of the aggregate: it takes a
//! command, runs one unit of work through the [`CommandHandler`] and returns
//! the committed events and the new stream version. Callers keep that version
//! and send it back with their next update; a stale version is reported as a
//! concurrency conflict instead of being applied.

use crate::cart::ShoppingCart;
use crate::events::ShoppingCartEvent;
use crate::errors::ShoppingCartResult;
use crate::pricing::ProductPriceCalculator;
use crate::types::{ClientId, ProductItem, ShoppingCartId};
use composable_es_core::aggregate::AggregateRoot;
use composable_es_core::environment::Clock;
use composable_es_core::event_store::EventStore;
use composable_es_core::stream::Version;
use composable_es_projections::ProjectionEngine;
use composable_es_runtime::{CommandHandler, CommandOutcome};
use std::sync::Arc;

/// Commands accepted by a shopping cart.
///
/// Update commands optionally carry the stream version the caller last
/// observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShoppingCartCommand {
    /// Open a new cart for a client
    Open {
        /// Cart to open
        cart_id: ShoppingCartId,
        /// Owning client
        client_id: ClientId,
    },
    /// Add units of a product
    AddItem {
        /// Cart
        cart_id: ShoppingCartId,
        /// Product and quantity
        item: ProductItem,
        /// Version the caller observed, if any
        expected_version: Option<Version>,
    },
    /// Remove units of a product
    RemoveItem {
        /// Cart
        cart_id: ShoppingCartId,
        /// Product and quantity
        item: ProductItem,
        /// Version the caller observed, if any
        expected_version: Option<Version>,
    },
    /// Check the cart out
    Confirm {
        /// Cart
        cart_id: ShoppingCartId,
        /// Version the caller observed, if any
        expected_version: Option<Version>,
    },
    /// Abandon the cart
    Cancel {
        /// Cart
        cart_id: ShoppingCartId,
        /// Version the caller observed, if any
        expected_version: Option<Version>,
    },
}

impl ShoppingCartCommand {
    /// Cart the command targets.
    #[must_use]
    pub const fn cart_id(&self) -> &ShoppingCartId {
        match self {
            Self::Open { cart_id, .. }
            | Self::AddItem { cart_id, .. }
            | Self::RemoveItem { cart_id, .. }
            | Self::Confirm { cart_id, .. }
            | Self::Cancel { cart_id, .. } => cart_id,
        }
    }
}

/// Outcome of a shopping cart command.
pub type ShoppingCartOutcome = CommandOutcome<ShoppingCartEvent>;

/// Executes shopping cart commands.
///
/// # Example
///
/// ```ignore
/// let service = ShoppingCartService::new(event_store, projections, prices, clock);
///
/// let opened = service.open(cart_id, client_id).await?;
/// let added = service
///     .add_item(cart_id, ProductItem::new("A", 2), Some(opened.version))
///     .await?;
/// service.confirm(cart_id, Some(added.version)).await?;
/// ```
#[derive(Clone)]
pub struct ShoppingCartService {
    handler: CommandHandler<ShoppingCart>,
    prices: Arc<dyn ProductPriceCalculator>,
    clock: Arc<dyn Clock>,
}

impl ShoppingCartService {
    /// Create a service appending to `event_store` and feeding `projections`.
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore>,
        projections: Arc<ProjectionEngine<ShoppingCartEvent>>,
        prices: Arc<dyn ProductPriceCalculator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            handler: CommandHandler::new(event_store, projections),
            prices,
            clock,
        }
    }

    /// The underlying command handler.
    #[must_use]
    pub const fn handler(&self) -> &CommandHandler<ShoppingCart> {
        &self.handler
    }

    /// Dispatch a command to its behaviour.
    ///
    /// # Errors
    ///
    /// See the per-command methods.
    pub async fn handle(&self, command: ShoppingCartCommand) -> ShoppingCartResult<ShoppingCartOutcome> {
        tracing::debug!(cart_id = %command.cart_id(), ?command, "Handling command");
        match command {
            ShoppingCartCommand::Open { cart_id, client_id } => self.open(cart_id, client_id).await,
            ShoppingCartCommand::AddItem {
                cart_id,
                item,
                expected_version,
            } => self.add_item(cart_id, item, expected_version).await,
            ShoppingCartCommand::RemoveItem {
                cart_id,
                item,
                expected_version,
            } => self.remove_item(cart_id, item, expected_version).await,
            ShoppingCartCommand::Confirm {
                cart_id,
                expected_version,
            } => self.confirm(cart_id, expected_version).await,
            ShoppingCartCommand::Cancel {
                cart_id,
                expected_version,
            } => self.cancel(cart_id, expected_version).await,
        }
    }

    /// Load a cart with the version to send back on the next update.
    ///
    /// # Errors
    ///
    /// `NotFound` if the cart was never opened, `Inconsistency` if its history
    /// cannot be replayed.
    pub async fn get(&self, cart_id: ShoppingCartId) -> ShoppingCartResult<(ShoppingCart, Version)> {
        let root = self.handler.load_existing(&cart_id).await?;
        let version = root.version();
        Ok((root.into_state(), version))
    }

    /// Load a cart for a multi-step unit of work finished with [`ShoppingCartService::commit`].
    ///
    /// # Errors
    ///
    /// As [`CommandHandler::load`].
    pub async fn load(&self, cart_id: ShoppingCartId) -> ShoppingCartResult<AggregateRoot<ShoppingCart>> {
        self.handler.load(&cart_id).await
    }

    /// Append the events recorded on `root`.
    ///
    /// # Errors
    ///
    /// As [`CommandHandler::commit`].
    pub async fn commit(&self, root: &mut AggregateRoot<ShoppingCart>) -> ShoppingCartResult<ShoppingCartOutcome> {
        self.handler.commit(root).await
    }

    /// Open a cart.
    ///
    /// # Errors
    ///
    /// `Validation(AlreadyOpened)` if the cart exists; `ConcurrencyConflict`
    /// if another open for the same cart was appended first.
    pub async fn open(&self, cart_id: ShoppingCartId, client_id: ClientId) -> ShoppingCartResult<ShoppingCartOutcome> {
        let now = self.clock.now();
        self.handler
            .create(&cart_id, |root| root.execute(|cart| cart.open(cart_id, client_id, now)))
            .await
    }

    /// Add units of a product, priced by the service's calculator.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ConcurrencyConflict`, or `Validation` with the cart's
    /// rejection.
    pub async fn add_item(
        &self,
        cart_id: ShoppingCartId,
        item: ProductItem,
        expected_version: Option<Version>,
    ) -> ShoppingCartResult<ShoppingCartOutcome> {
        let now = self.clock.now();
        let prices = Arc::clone(&self.prices);
        self.handler
            .update(&cart_id, expected_version, move |root| {
                root.execute(|cart| cart.add_item(&item, prices.as_ref(), now))
            })
            .await
    }

    /// Remove units of a product.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ConcurrencyConflict`, or `Validation` with the cart's
    /// rejection.
    pub async fn remove_item(
        &self,
        cart_id: ShoppingCartId,
        item: ProductItem,
        expected_version: Option<Version>,
    ) -> ShoppingCartResult<ShoppingCartOutcome> {
        let now = self.clock.now();
        self.handler
            .update(&cart_id, expected_version, move |root| {
                root.execute(|cart| cart.remove_item(&item, now))
            })
            .await
    }

    /// Confirm a cart.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ConcurrencyConflict`, or `Validation` with the cart's
    /// rejection.
    pub async fn confirm(
        &self,
        cart_id: ShoppingCartId,
        expected_version: Option<Version>,
    ) -> ShoppingCartResult<ShoppingCartOutcome> {
        let now = self.clock.now();
        self.handler
            .update(&cart_id, expected_version, |root| root.execute(|cart| cart.confirm(now)))
            .await
    }

    /// Cancel a cart.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ConcurrencyConflict`, or `Validation` with the cart's
    /// rejection.
    pub async fn cancel(
        &self,
        cart_id: ShoppingCartId,
        expected_version: Option<Version>,
    ) -> ShoppingCartResult<ShoppingCartOutcome> {
        let now = self.clock.now();
        self.handler
            .update(&cart_id, expected_version, |root| root.execute(|cart| cart.cancel(now)))
            .await
    }
}

impl std::fmt::Debug for ShoppingCartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShoppingCartService")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}
