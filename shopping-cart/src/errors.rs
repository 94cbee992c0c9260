//! Business-rule rejections of shopping cart commands.

use crate::types::{ProductId, ShoppingCartStatus};
use composable_es_core::error::CommandError;
use thiserror::Error;

/// Why a shopping cart command was refused.
///
/// Rejections are decided before any event is produced; a rejected command
/// leaves the stream untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShoppingCartError {
    /// Open was issued for a cart that already exists
    #[error("Shopping cart is already opened")]
    AlreadyOpened,

    /// A command other than open was issued for a cart that was never opened
    #[error("Shopping cart is not opened")]
    NotOpened,

    /// The cart is confirmed or canceled
    #[error("Shopping cart is closed ({status})")]
    Closed {
        /// Terminal status the cart is in
        status: ShoppingCartStatus,
    },

    /// Items must be added or removed in positive quantities
    #[error("Quantity must be greater than zero")]
    ZeroQuantity,

    /// The price calculator has no price for the product
    #[error("No price found for product {0}")]
    PriceNotFound(ProductId),

    /// Removal of more units than the cart holds
    #[error("Cannot remove {requested} of product {product_id}: only {available} in cart")]
    InsufficientQuantity {
        /// Product
        product_id: ProductId,
        /// Units requested for removal
        requested: u32,
        /// Units currently in the cart
        available: u32,
    },

    /// Adding the units would take the cart past `u32::MAX` units
    #[error("Cannot add {requested} of product {product_id}: cart already holds {in_cart} units")]
    QuantityOverflow {
        /// Product
        product_id: ProductId,
        /// Units requested for addition
        requested: u32,
        /// Units currently in the cart, across all lines
        in_cart: u32,
    },

    /// The cart total would no longer fit in a money amount
    #[error("Cart total overflows after changing product {0}")]
    AmountOverflow(ProductId),

    /// Confirm was issued for a cart with no items
    #[error("Cannot confirm an empty shopping cart")]
    Empty,
}

/// Result of a shopping cart command.
pub type ShoppingCartResult<T> = Result<T, CommandError<ShoppingCartError>>;
