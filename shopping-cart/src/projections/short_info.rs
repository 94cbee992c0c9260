//! Compact view of open carts, for listings.

use super::{contradiction, overflow};
use crate::events::ShoppingCartEvent;
use crate::types::{ClientId, Money, ShoppingCartId};
use composable_es_core::projection::{Projection, ProjectionStore, Result};
use composable_es_projections::ReadModelTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key prefix of [`ShoppingCartShortInfo`] rows.
pub const PREFIX: &str = "cart_short_info:";

/// Totals of a pending cart, keyed by cart id.
///
/// The row is deleted once the cart is confirmed or canceled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCartShortInfo {
    /// Cart
    pub id: ShoppingCartId,
    /// Owning client
    pub client_id: ClientId,
    /// Sum of line quantities
    pub total_items_count: u32,
    /// Sum of line amounts
    pub total_amount: Money,
}

/// Maintains [`ShoppingCartShortInfo`].
pub struct ShoppingCartShortInfoProjection<S> {
    table: ReadModelTable<S, ShoppingCartShortInfo>,
}

impl<S: ProjectionStore> ShoppingCartShortInfoProjection<S> {
    /// Create the projection over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            table: ReadModelTable::new(store, PREFIX),
        }
    }
}

impl<S: ProjectionStore> Projection for ShoppingCartShortInfoProjection<S> {
    type Event = ShoppingCartEvent;

    fn name(&self) -> &str {
        "shopping_cart_short_info"
    }

    async fn apply_event(&self, event: &ShoppingCartEvent) -> Result<()> {
        match event {
            ShoppingCartEvent::Opened {
                cart_id, client_id, ..
            } => {
                let row = ShoppingCartShortInfo {
                    id: *cart_id,
                    client_id: *client_id,
                    total_items_count: 0,
                    total_amount: Money::ZERO,
                };
                self.table.save(cart_id, &row).await
            }
            ShoppingCartEvent::ProductItemAdded { cart_id, item, .. } => {
                let key = self.table.key(cart_id);
                let mut row = self.table.require(self.name(), cart_id).await?;
                row.total_items_count = row
                    .total_items_count
                    .checked_add(item.quantity)
                    .ok_or_else(|| overflow(&key))?;
                row.total_amount = item
                    .checked_total_amount()
                    .and_then(|amount| row.total_amount.checked_add(amount))
                    .ok_or_else(|| overflow(&key))?;
                self.table.save(cart_id, &row).await
            }
            ShoppingCartEvent::ProductItemRemoved { cart_id, item, .. } => {
                let key = self.table.key(cart_id);
                let mut row = self.table.require(self.name(), cart_id).await?;
                row.total_items_count = row.total_items_count.checked_sub(item.quantity).ok_or_else(|| {
                    contradiction(
                        &key,
                        format!("holds {} units, event removes {}", row.total_items_count, item.quantity),
                    )
                })?;
                row.total_amount = item
                    .checked_total_amount()
                    .and_then(|amount| row.total_amount.checked_sub(amount))
                    .ok_or_else(|| overflow(&key))?;
                self.table.save(cart_id, &row).await
            }
            ShoppingCartEvent::Confirmed { cart_id, .. } | ShoppingCartEvent::Canceled { cart_id, .. } => {
                tracing::debug!(cart_id = %cart_id, "Cart closed, dropping short info");
                self.table.delete(cart_id).await
            }
        }
    }

    async fn rebuild(&self) -> Result<()> {
        self.table.clear().await?;
        Ok(())
    }
}
