//! The closed set of shopping cart events.

use crate::types::{ClientId, PricedProductItem, ShoppingCartId};
use chrono::{DateTime, Utc};
use composable_es_core::event::Event;
use serde::{Deserialize, Serialize};

/// Facts recorded in a shopping cart stream.
///
/// Stored kinds carry a version suffix; a kind is never reused for a
/// different payload shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShoppingCartEvent {
    /// A cart was opened for a client
    Opened {
        /// Cart
        cart_id: ShoppingCartId,
        /// Owning client
        client_id: ClientId,
        /// When the cart was opened
        opened_at: DateTime<Utc>,
    },
    /// A priced product item was added
    ProductItemAdded {
        /// Cart
        cart_id: ShoppingCartId,
        /// Added item, priced at the time it was added
        item: PricedProductItem,
        /// When the item was added
        added_at: DateTime<Utc>,
    },
    /// A product item was removed, at the line's unit price
    ProductItemRemoved {
        /// Cart
        cart_id: ShoppingCartId,
        /// Removed item
        item: PricedProductItem,
        /// When the item was removed
        removed_at: DateTime<Utc>,
    },
    /// The cart was checked out
    Confirmed {
        /// Cart
        cart_id: ShoppingCartId,
        /// When the cart was confirmed
        confirmed_at: DateTime<Utc>,
    },
    /// The cart was abandoned
    Canceled {
        /// Cart
        cart_id: ShoppingCartId,
        /// When the cart was canceled
        canceled_at: DateTime<Utc>,
    },
}

impl ShoppingCartEvent {
    /// Cart the event belongs to.
    #[must_use]
    pub const fn cart_id(&self) -> &ShoppingCartId {
        match self {
            Self::Opened { cart_id, .. }
            | Self::ProductItemAdded { cart_id, .. }
            | Self::ProductItemRemoved { cart_id, .. }
            | Self::Confirmed { cart_id, .. }
            | Self::Canceled { cart_id, .. } => cart_id,
        }
    }

    /// When the fact happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Opened { opened_at: at, .. }
            | Self::ProductItemAdded { added_at: at, .. }
            | Self::ProductItemRemoved { removed_at: at, .. }
            | Self::Confirmed { confirmed_at: at, .. }
            | Self::Canceled { canceled_at: at, .. } => *at,
        }
    }
}

impl Event for ShoppingCartEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "ShoppingCartOpened.v1",
        "ProductItemAddedToShoppingCart.v1",
        "ProductItemRemovedFromShoppingCart.v1",
        "ShoppingCartConfirmed.v1",
        "ShoppingCartCanceled.v1",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "ShoppingCartOpened.v1",
            Self::ProductItemAdded { .. } => "ProductItemAddedToShoppingCart.v1",
            Self::ProductItemRemoved { .. } => "ProductItemRemovedFromShoppingCart.v1",
            Self::Confirmed { .. } => "ShoppingCartConfirmed.v1",
            Self::Canceled { .. } => "ShoppingCartCanceled.v1",
        }
    }
}
