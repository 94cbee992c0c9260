//! Core domain types for shopping carts.
//!
//! Carts progress through `Pending → (Confirmed | Canceled)`; both end states
//! are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use uuid::Uuid;

/// Unique identifier for a shopping cart
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShoppingCartId(Uuid);

impl ShoppingCartId {
    /// Creates a new random `ShoppingCartId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `ShoppingCartId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShoppingCartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShoppingCartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the client owning carts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random `ClientId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `ClientId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalogue identifier of a product
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new `ProductId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Money amount in cents (to avoid floating point issues)
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new money amount from dollars (converted to cents)
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// `self + rhs`, or `None` on overflow
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// `self - rhs`, or `None` on overflow
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// `self × quantity`, or `None` on overflow
    #[must_use]
    #[allow(clippy::cast_lossless)] // `i64::from` is not const
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as i64) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * i64::from(quantity))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

/// A product and quantity as requested by the client, before pricing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductItem {
    /// Product identifier
    pub product_id: ProductId,
    /// Requested quantity
    pub quantity: u32,
}

impl ProductItem {
    /// Creates a new product item
    #[must_use]
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: ProductId::new(product_id),
            quantity,
        }
    }

    /// Attach a unit price
    #[must_use]
    pub fn priced(self, unit_price: Money) -> PricedProductItem {
        PricedProductItem {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price,
        }
    }
}

/// A product item with the unit price it was added at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedProductItem {
    /// Product identifier
    pub product_id: ProductId,
    /// Quantity
    pub quantity: u32,
    /// Price per unit
    pub unit_price: Money,
}

impl PricedProductItem {
    /// `unit_price × quantity`
    ///
    /// Callers must know the product fits; carts only hold lines whose
    /// amounts do. Use [`PricedProductItem::checked_total_amount`] otherwise.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// `unit_price × quantity`, or `None` on overflow
    #[must_use]
    pub const fn checked_total_amount(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Lifecycle status of a cart
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShoppingCartStatus {
    /// Open for changes
    #[default]
    Pending,
    /// Checked out (terminal)
    Confirmed,
    /// Abandoned (terminal)
    Canceled,
}

impl ShoppingCartStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Confirmed | Self::Canceled)
    }
}

impl fmt::Display for ShoppingCartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Canceled => write!(f, "Canceled"),
        }
    }
}
