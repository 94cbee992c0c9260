//! Per-client totals across all of a client's carts.
//!
//! Item and status events carry only the cart id, so the projection keeps a
//! second table mapping each pending cart to its client and running totals.
//! That index row is written on open, updated on item changes and removed
//! when the cart closes, at which point its totals move from the pending
//! figures of the summary into the confirmed or canceled ones.

use super::{contradiction, overflow};
use crate::events::ShoppingCartEvent;
use crate::types::{ClientId, Money, PricedProductItem, ShoppingCartId};
use composable_es_core::projection::{Projection, ProjectionStore, Result};
use composable_es_projections::ReadModelTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key prefix of [`ClientShoppingSummary`] rows.
pub const PREFIX: &str = "client_summary:";

/// Key prefix of the cart → client index rows.
pub const CART_INDEX_PREFIX: &str = "client_cart:";

/// Cart counts and amounts of one client, keyed by client id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientShoppingSummary {
    /// Carts still pending
    pub pending_count: u32,
    /// Carts confirmed
    pub confirmed_count: u32,
    /// Carts canceled
    pub canceled_count: u32,
    /// Units across pending carts
    pub pending_items_count: u64,
    /// Amount across pending carts
    pub pending_amount: Money,
    /// Amount of confirmed carts
    pub confirmed_amount: Money,
}

/// Running totals of one pending cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCart {
    /// Owning client
    pub client_id: ClientId,
    /// Units in the cart
    pub items_count: u32,
    /// Amount of the cart
    pub amount: Money,
}

/// Maintains [`ClientShoppingSummary`] and its cart index.
pub struct ClientShoppingSummaryProjection<S> {
    summaries: ReadModelTable<S, ClientShoppingSummary>,
    carts: ReadModelTable<S, ClientCart>,
}

impl<S: ProjectionStore> ClientShoppingSummaryProjection<S> {
    /// Create the projection over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            summaries: ReadModelTable::new(Arc::clone(&store), PREFIX),
            carts: ReadModelTable::new(store, CART_INDEX_PREFIX),
        }
    }

    async fn opened(&self, cart_id: &ShoppingCartId, client_id: &ClientId) -> Result<()> {
        let mut summary = self.summaries.load(client_id).await?.unwrap_or_default();
        summary.pending_count = summary
            .pending_count
            .checked_add(1)
            .ok_or_else(|| overflow(&self.summaries.key(client_id)))?;

        let cart = ClientCart {
            client_id: *client_id,
            items_count: 0,
            amount: Money::ZERO,
        };
        self.carts.save(cart_id, &cart).await?;
        self.summaries.save(client_id, &summary).await
    }

    async fn items_changed(
        &self,
        cart_id: &ShoppingCartId,
        item: &PricedProductItem,
        added: bool,
    ) -> Result<()> {
        let mut cart = self.carts.require(self.name(), cart_id).await?;
        let mut summary = self.summaries.require(self.name(), cart.client_id).await?;
        let cart_key = self.carts.key(cart_id);
        let summary_key = self.summaries.key(cart.client_id);
        let amount = item.checked_total_amount().ok_or_else(|| overflow(&cart_key))?;
        let quantity = u64::from(item.quantity);

        if added {
            cart.items_count = cart
                .items_count
                .checked_add(item.quantity)
                .ok_or_else(|| overflow(&cart_key))?;
            cart.amount = cart.amount.checked_add(amount).ok_or_else(|| overflow(&cart_key))?;
            summary.pending_items_count = summary
                .pending_items_count
                .checked_add(quantity)
                .ok_or_else(|| overflow(&summary_key))?;
            summary.pending_amount = summary
                .pending_amount
                .checked_add(amount)
                .ok_or_else(|| overflow(&summary_key))?;
        } else {
            cart.items_count = cart.items_count.checked_sub(item.quantity).ok_or_else(|| {
                contradiction(
                    &cart_key,
                    format!("holds {} units, event removes {}", cart.items_count, item.quantity),
                )
            })?;
            cart.amount = cart.amount.checked_sub(amount).ok_or_else(|| overflow(&cart_key))?;
            summary.pending_items_count = summary
                .pending_items_count
                .checked_sub(quantity)
                .ok_or_else(|| {
                    contradiction(
                        &summary_key,
                        format!(
                            "holds {} pending units, event removes {quantity}",
                            summary.pending_items_count
                        ),
                    )
                })?;
            summary.pending_amount = summary
                .pending_amount
                .checked_sub(amount)
                .ok_or_else(|| overflow(&summary_key))?;
        }

        self.carts.save(cart_id, &cart).await?;
        self.summaries.save(cart.client_id, &summary).await
    }

    async fn closed(&self, cart_id: &ShoppingCartId, confirmed: bool) -> Result<()> {
        let cart = self.carts.require(self.name(), cart_id).await?;
        let mut summary = self.summaries.require(self.name(), cart.client_id).await?;
        let key = self.summaries.key(cart.client_id);

        summary.pending_count = summary
            .pending_count
            .checked_sub(1)
            .ok_or_else(|| contradiction(&key, "holds no pending cart to close"))?;
        summary.pending_items_count = summary
            .pending_items_count
            .checked_sub(u64::from(cart.items_count))
            .ok_or_else(|| {
                contradiction(
                    &key,
                    format!(
                        "holds {} pending units, closing cart holds {}",
                        summary.pending_items_count, cart.items_count
                    ),
                )
            })?;
        summary.pending_amount = summary
            .pending_amount
            .checked_sub(cart.amount)
            .ok_or_else(|| overflow(&key))?;
        if confirmed {
            summary.confirmed_count = summary.confirmed_count.checked_add(1).ok_or_else(|| overflow(&key))?;
            summary.confirmed_amount = summary
                .confirmed_amount
                .checked_add(cart.amount)
                .ok_or_else(|| overflow(&key))?;
        } else {
            summary.canceled_count = summary.canceled_count.checked_add(1).ok_or_else(|| overflow(&key))?;
        }

        self.carts.delete(cart_id).await?;
        self.summaries.save(cart.client_id, &summary).await
    }
}

impl<S: ProjectionStore> Projection for ClientShoppingSummaryProjection<S> {
    type Event = ShoppingCartEvent;

    fn name(&self) -> &str {
        "client_shopping_summary"
    }

    async fn apply_event(&self, event: &ShoppingCartEvent) -> Result<()> {
        tracing::debug!(
            cart_id = %event.cart_id(),
            event_type = composable_es_core::event::Event::event_type(event),
            "Updating client summary"
        );
        match event {
            ShoppingCartEvent::Opened {
                cart_id, client_id, ..
            } => self.opened(cart_id, client_id).await,
            ShoppingCartEvent::ProductItemAdded { cart_id, item, .. } => {
                self.items_changed(cart_id, item, true).await
            }
            ShoppingCartEvent::ProductItemRemoved { cart_id, item, .. } => {
                self.items_changed(cart_id, item, false).await
            }
            ShoppingCartEvent::Confirmed { cart_id, .. } => self.closed(cart_id, true).await,
            ShoppingCartEvent::Canceled { cart_id, .. } => self.closed(cart_id, false).await,
        }
    }

    async fn rebuild(&self) -> Result<()> {
        self.summaries.clear().await?;
        self.carts.clear().await?;
        Ok(())
    }
}
