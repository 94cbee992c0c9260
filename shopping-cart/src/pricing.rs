//! Product price calculation.
//!
//! Pricing is an external collaborator of the cart: a pure lookup consulted
//! when an item is added. The unit price it returns is recorded in the event,
//! so later price changes never alter a replayed cart.

use crate::errors::ShoppingCartError;
use crate::types::{Money, PricedProductItem, ProductId, ProductItem};
use std::collections::HashMap;

/// Prices raw product items.
pub trait ProductPriceCalculator: Send + Sync {
    /// Attach the current unit price to `item`.
    ///
    /// # Errors
    ///
    /// Returns [`ShoppingCartError::PriceNotFound`] if the product has no price.
    fn calculate(&self, item: &ProductItem) -> Result<PricedProductItem, ShoppingCartError>;
}

/// Fixed catalogue of unit prices.
///
/// # Example
///
/// ```
/// use shopping_cart::pricing::{PriceList, ProductPriceCalculator};
/// use shopping_cart::types::{Money, ProductItem};
///
/// let prices = PriceList::new().with_price("A", Money::from_cents(100));
///
/// let priced = prices.calculate(&ProductItem::new("A", 2)).unwrap();
/// assert_eq!(priced.total_amount(), Money::from_cents(200));
/// assert!(prices.calculate(&ProductItem::new("B", 1)).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PriceList {
    prices: HashMap<ProductId, Money>,
}

impl PriceList {
    /// Create an empty price list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unit price of a product (builder style).
    #[must_use]
    pub fn with_price(mut self, product_id: impl Into<String>, unit_price: Money) -> Self {
        self.set_price(product_id, unit_price);
        self
    }

    /// Set the unit price of a product.
    pub fn set_price(&mut self, product_id: impl Into<String>, unit_price: Money) {
        self.prices.insert(ProductId::new(product_id), unit_price);
    }

    /// Unit price of a product, if listed.
    #[must_use]
    pub fn price_of(&self, product_id: &ProductId) -> Option<Money> {
        self.prices.get(product_id).copied()
    }
}

impl ProductPriceCalculator for PriceList {
    fn calculate(&self, item: &ProductItem) -> Result<PricedProductItem, ShoppingCartError> {
        let unit_price = self
            .price_of(&item.product_id)
            .ok_or_else(|| ShoppingCartError::PriceNotFound(item.product_id.clone()))?;
        Ok(item.clone().priced(unit_price))
    }
}

/// Prices every product the same.
#[derive(Clone, Copy, Debug)]
pub struct UniformPrice(pub Money);

impl ProductPriceCalculator for UniformPrice {
    fn calculate(&self, item: &ProductItem) -> Result<PricedProductItem, ShoppingCartError> {
        Ok(item.clone().priced(self.0))
    }
}
