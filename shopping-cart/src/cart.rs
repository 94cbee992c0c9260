//! The `ShoppingCart` aggregate.
//!
//! State is rebuilt by folding [`ShoppingCartEvent`]s; behaviours validate the
//! current state and return the single event that records their decision.
//!
//! | Behaviour | Accepted when | Records |
//! |---|---|---|
//! | [`open`](ShoppingCart::open) | cart not opened yet | `Opened` |
//! | [`add_item`](ShoppingCart::add_item) | pending, priced, quantity > 0, totals fit | `ProductItemAdded` |
//! | [`remove_item`](ShoppingCart::remove_item) | pending, enough units, quantity > 0 | `ProductItemRemoved` |
//!
//! A cart never holds more than `u32::MAX` units in total, and its total
//! amount always fits in [`Money`]; additions that would break either bound
//! are rejected.

//! | [`confirm`](ShoppingCart::confirm) | pending, not empty | `Confirmed` |
//! | [`cancel`](ShoppingCart::cancel) | pending | `Canceled` |

use crate::errors::ShoppingCartError;
use crate::events::ShoppingCartEvent;
use crate::pricing::ProductPriceCalculator;
use crate::types::{ClientId, Money, PricedProductItem, ProductId, ProductItem, ShoppingCartId, ShoppingCartStatus};
use chrono::{DateTime, Utc};
use composable_es_core::aggregate::Aggregate;
use std::collections::BTreeMap;

/// One product line of a cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartLine {
    /// Unit price the line was first added at
    pub unit_price: Money,
    /// Units in the cart, always positive
    pub quantity: u32,
}

/// A client's shopping cart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShoppingCart {
    id: Option<ShoppingCartId>,
    client_id: Option<ClientId>,
    status: ShoppingCartStatus,
    lines: BTreeMap<ProductId, CartLine>,
    opened_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
}

impl Aggregate for ShoppingCart {
    type Event = ShoppingCartEvent;
    type Id = ShoppingCartId;
    type Rejection = ShoppingCartError;

    const KIND: &'static str = "shopping_cart";

    fn initial() -> Self {
        Self::default()
    }

    fn apply(&mut self, event: &ShoppingCartEvent) {
        match event {
            ShoppingCartEvent::Opened {
                cart_id,
                client_id,
                opened_at,
            } => {
                self.id = Some(*cart_id);
                self.client_id = Some(*client_id);
                self.status = ShoppingCartStatus::Pending;
                self.opened_at = Some(*opened_at);
            }
            ShoppingCartEvent::ProductItemAdded { item, .. } => {
                self.lines
                    .entry(item.product_id.clone())
                    // add_item keeps the sum in range
                    .and_modify(|line| line.quantity = line.quantity.saturating_add(item.quantity))
                    .or_insert(CartLine {
                        unit_price: item.unit_price,
                        quantity: item.quantity,
                    });
            }
            ShoppingCartEvent::ProductItemRemoved { item, .. } => {
                if let Some(line) = self.lines.get_mut(&item.product_id) {
                    line.quantity = line.quantity.saturating_sub(item.quantity);
                    if line.quantity == 0 {
                        self.lines.remove(&item.product_id);
                    }
                }
            }
            ShoppingCartEvent::Confirmed { confirmed_at, .. } => {
                self.status = ShoppingCartStatus::Confirmed;
                self.confirmed_at = Some(*confirmed_at);
            }
            ShoppingCartEvent::Canceled { canceled_at, .. } => {
                self.status = ShoppingCartStatus::Canceled;
                self.canceled_at = Some(*canceled_at);
            }
        }
    }
}

impl ShoppingCart {
    /// Cart identity, once opened.
    #[must_use]
    pub const fn id(&self) -> Option<&ShoppingCartId> {
        self.id.as_ref()
    }

    /// Owning client, once opened.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ShoppingCartStatus {
        self.status
    }

    /// Whether the cart has been opened.
    #[must_use]
    pub const fn is_opened(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the cart is confirmed or canceled.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// Product lines, ordered by product id.
    #[must_use]
    pub const fn lines(&self) -> &BTreeMap<ProductId, CartLine> {
        &self.lines
    }

    /// Lines as priced items, ordered by product id.
    #[must_use]
    pub fn items(&self) -> Vec<PricedProductItem> {
        self.lines
            .iter()
            .map(|(product_id, line)| PricedProductItem {
                product_id: product_id.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect()
    }

    /// Units of `product_id` in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines.get(product_id).map_or(0, |line| line.quantity)
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.values().map(|line| line.quantity).sum()
    }

    /// Sum of `unit_price × quantity` across lines.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.lines
            .values()
            .map(|line| line.unit_price * line.quantity)
            .sum()
    }

    /// When the cart was opened.
    #[must_use]
    pub const fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// When the cart was confirmed.
    #[must_use]
    pub const fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    /// When the cart was canceled.
    #[must_use]
    pub const fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    /// Open a new cart.
    ///
    /// # Errors
    ///
    /// [`ShoppingCartError::AlreadyOpened`] if the cart has history.
    pub fn open(
        &self,
        cart_id: ShoppingCartId,
        client_id: ClientId,
        now: DateTime<Utc>,
    ) -> Result<ShoppingCartEvent, ShoppingCartError> {
        if self.is_opened() {
            return Err(ShoppingCartError::AlreadyOpened);
        }
        Ok(ShoppingCartEvent::Opened {
            cart_id,
            client_id,
            opened_at: now,
        })
    }

    /// Add a product item at the price `prices` quotes for it.
    ///
    /// # Errors
    ///
    /// - [`ShoppingCartError::NotOpened`] / [`ShoppingCartError::Closed`]
    /// - [`ShoppingCartError::ZeroQuantity`]
    /// - [`ShoppingCartError::QuantityOverflow`] if the cart would hold more
    ///   than `u32::MAX` units
    /// - [`ShoppingCartError::PriceNotFound`] from the calculator
    /// - [`ShoppingCartError::AmountOverflow`] if the cart total would overflow
    pub fn add_item(
        &self,
        item: &ProductItem,
        prices: &dyn ProductPriceCalculator,
        now: DateTime<Utc>,
    ) -> Result<ShoppingCartEvent, ShoppingCartError> {
        let cart_id = self.ensure_pending()?;
        if item.quantity == 0 {
            return Err(ShoppingCartError::ZeroQuantity);
        }
        let in_cart = self.total_items();
        if in_cart.checked_add(item.quantity).is_none() {
            return Err(ShoppingCartError::QuantityOverflow {
                product_id: item.product_id.clone(),
                requested: item.quantity,
                in_cart,
            });
        }
        let priced = prices.calculate(item)?;
        self.ensure_amount_fits(
            &item.product_id,
            ShoppingCartEvent::ProductItemAdded {
                cart_id,
                item: priced,
                added_at: now,
            },
        )
    }

    /// Remove units of a product, priced at the line's unit price.
    ///
    /// # Errors
    ///
    /// - [`ShoppingCartError::NotOpened`] / [`ShoppingCartError::Closed`]
    /// - [`ShoppingCartError::ZeroQuantity`]
    /// - [`ShoppingCartError::InsufficientQuantity`] if the cart holds fewer
    ///   units than requested
    /// - [`ShoppingCartError::AmountOverflow`] if the cart total would overflow
    pub fn remove_item(
        &self,
        item: &ProductItem,
        now: DateTime<Utc>,
    ) -> Result<ShoppingCartEvent, ShoppingCartError> {
        let cart_id = self.ensure_pending()?;
        if item.quantity == 0 {
            return Err(ShoppingCartError::ZeroQuantity);
        }
        let line = self
            .lines
            .get(&item.product_id)
            .filter(|line| line.quantity >= item.quantity)
            .ok_or_else(|| ShoppingCartError::InsufficientQuantity {
                product_id: item.product_id.clone(),
                requested: item.quantity,
                available: self.quantity_of(&item.product_id),
            })?;
        self.ensure_amount_fits(
            &item.product_id,
            ShoppingCartEvent::ProductItemRemoved {
                cart_id,
                item: item.clone().priced(line.unit_price),
                removed_at: now,
            },
        )
    }

    /// Check the cart out.
    ///
    /// # Errors
    ///
    /// - [`ShoppingCartError::NotOpened`] / [`ShoppingCartError::Closed`]
    /// - [`ShoppingCartError::Empty`] if the cart has no lines
    pub fn confirm(&self, now: DateTime<Utc>) -> Result<ShoppingCartEvent, ShoppingCartError> {
        let cart_id = self.ensure_pending()?;
        if self.lines.is_empty() {
            return Err(ShoppingCartError::Empty);
        }
        Ok(ShoppingCartEvent::Confirmed {
            cart_id,
            confirmed_at: now,
        })
    }

    /// Abandon the cart.
    ///
    /// # Errors
    ///
    /// [`ShoppingCartError::NotOpened`] / [`ShoppingCartError::Closed`]
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<ShoppingCartEvent, ShoppingCartError> {
        let cart_id = self.ensure_pending()?;
        Ok(ShoppingCartEvent::Canceled {
            cart_id,
            canceled_at: now,
        })
    }

    /// Accept an item event for `product_id` only if the cart total still
    /// fits afterwards.
    fn ensure_amount_fits(
        &self,
        product_id: &ProductId,
        event: ShoppingCartEvent,
    ) -> Result<ShoppingCartEvent, ShoppingCartError> {
        let next = self.clone().fold(&event);
        next.lines
            .values()
            .try_fold(Money::ZERO, |total, line| {
                total.checked_add(line.unit_price.checked_mul(line.quantity)?)
            })
            .map(|_| event)
            .ok_or_else(|| ShoppingCartError::AmountOverflow(product_id.clone()))
    }

    fn ensure_pending(&self) -> Result<ShoppingCartId, ShoppingCartError> {
        let cart_id = self.id.ok_or(ShoppingCartError::NotOpened)?;
        if self.status.is_closed() {
            return Err(ShoppingCartError::Closed {
                status: self.status,
            });
        }
        Ok(cart_id)
    }
}
