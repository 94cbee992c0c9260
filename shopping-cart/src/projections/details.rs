//! Full view of one cart.

use super::{contradiction, overflow};
use crate::events::ShoppingCartEvent;
use crate::types::{ClientId, Money, PricedProductItem, ShoppingCartId, ShoppingCartStatus};
use chrono::{DateTime, Utc};
use composable_es_core::projection::{Projection, ProjectionStore, Result};
use composable_es_projections::ReadModelTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key prefix of [`ShoppingCartDetails`] rows.
pub const PREFIX: &str = "cart_details:";

/// Denormalized cart, keyed by cart id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCartDetails {
    /// Cart
    pub id: ShoppingCartId,
    /// Owning client
    pub client_id: ClientId,
    /// Lifecycle status
    pub status: ShoppingCartStatus,
    /// Lines ordered by first addition
    pub product_items: Vec<PricedProductItem>,
    /// Sum of line amounts
    pub total_amount: Money,
    /// Sum of line quantities
    pub total_items_count: u32,
    /// When the cart was opened
    pub opened_at: DateTime<Utc>,
    /// When the cart was confirmed
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the cart was canceled
    pub canceled_at: Option<DateTime<Utc>>,
    /// Number of cart events folded into this row
    pub events_applied: u64,
}

impl ShoppingCartDetails {
    fn add(&mut self, key: &str, item: &PricedProductItem) -> Result<()> {
        let total_items_count = self.total_items_count.checked_add(item.quantity);
        let total_amount = item
            .checked_total_amount()
            .and_then(|amount| self.total_amount.checked_add(amount));
        let (Some(total_items_count), Some(total_amount)) = (total_items_count, total_amount) else {
            return Err(overflow(key));
        };

        match self
            .product_items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| overflow(key))?;
            }
            None => self.product_items.push(item.clone()),
        }
        self.total_items_count = total_items_count;
        self.total_amount = total_amount;
        Ok(())
    }

    fn remove(&mut self, key: &str, item: &PricedProductItem) -> Result<()> {
        let index = self
            .product_items
            .iter()
            .position(|line| line.product_id == item.product_id);
        let held = index.map_or(0, |index| self.product_items[index].quantity);
        let (Some(index), Some(remaining)) = (index, held.checked_sub(item.quantity)) else {
            return Err(contradiction(
                key,
                format!("holds {held} units of {}, event removes {}", item.product_id, item.quantity),
            ));
        };
        let total_items_count = self.total_items_count.checked_sub(item.quantity).ok_or_else(|| {
            contradiction(
                key,
                format!("holds {} units, event removes {}", self.total_items_count, item.quantity),
            )
        })?;
        let total_amount = item
            .checked_total_amount()
            .and_then(|amount| self.total_amount.checked_sub(amount))
            .ok_or_else(|| overflow(key))?;

        if remaining == 0 {
            self.product_items.remove(index);
        } else {
            self.product_items[index].quantity = remaining;
        }
        self.total_items_count = total_items_count;
        self.total_amount = total_amount;
        Ok(())
    }
}

/// Maintains [`ShoppingCartDetails`].
pub struct ShoppingCartDetailsProjection<S> {
    table: ReadModelTable<S, ShoppingCartDetails>,
}

impl<S: ProjectionStore> ShoppingCartDetailsProjection<S> {
    /// Create the projection over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            table: ReadModelTable::new(store, PREFIX),
        }
    }
}

impl<S: ProjectionStore> Projection for ShoppingCartDetailsProjection<S> {
    type Event = ShoppingCartEvent;

    fn name(&self) -> &str {
        "shopping_cart_details"
    }

    async fn apply_event(&self, event: &ShoppingCartEvent) -> Result<()> {
        let cart_id = event.cart_id();

        let mut row = if let ShoppingCartEvent::Opened {
            cart_id,
            client_id,
            opened_at,
        } = event
        {
            ShoppingCartDetails {
                id: *cart_id,
                client_id: *client_id,
                status: ShoppingCartStatus::Pending,
                product_items: Vec::new(),
                total_amount: Money::ZERO,
                total_items_count: 0,
                opened_at: *opened_at,
                confirmed_at: None,
                canceled_at: None,
                events_applied: 0,
            }
        } else {
            self.table.require(self.name(), cart_id).await?
        };

        match event {
            ShoppingCartEvent::Opened { .. } => {}
            ShoppingCartEvent::ProductItemAdded { item, .. } => row.add(&self.table.key(cart_id), item)?,
            ShoppingCartEvent::ProductItemRemoved { item, .. } => {
                row.remove(&self.table.key(cart_id), item)?;
            }
            ShoppingCartEvent::Confirmed { confirmed_at, .. } => {
                row.status = ShoppingCartStatus::Confirmed;
                row.confirmed_at = Some(*confirmed_at);
            }
            ShoppingCartEvent::Canceled { canceled_at, .. } => {
                row.status = ShoppingCartStatus::Canceled;
                row.canceled_at = Some(*canceled_at);
            }
        }
        row.events_applied += 1;

        tracing::debug!(
            cart_id = %cart_id,
            events_applied = row.events_applied,
            "Updated cart details"
        );
        self.table.save(cart_id, &row).await
    }

    async fn rebuild(&self) -> Result<()> {
        let removed = self.table.clear().await?;
        tracing::debug!(removed, "Cleared cart details");
        Ok(())
    }
}
