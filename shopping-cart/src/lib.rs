//! Event-sourced shopping carts.
//!
//! A cart's state is never stored: every command replays the cart's stream,
//! decides against the replayed state and appends the resulting event with
//! the version it read. A writer that lost the race gets a concurrency
//! conflict instead of overwriting the winner's decision.
//!
//! # Architecture
//!
//! ```text
//! ShoppingCartCommand ──► ShoppingCartService ──► CommandHandler<ShoppingCart>
//!                                                   │ load + replay
//!                                                   │ decide (ShoppingCart behaviours)
//!                                                   │ compare-and-append
//!                                                   ▼
//!                                   EventStore ──► ProjectionEngine
//!                                                   ├─ ShoppingCartDetails
//!                                                   ├─ ShoppingCartShortInfo
//!                                                   └─ ClientShoppingSummary
//! ```
//!
//! # Example
//!
//! ```
//! use composable_es_core::environment::SystemClock;
//! use composable_es_testing::{InMemoryEventStore, InMemoryProjectionStore};
//! use shopping_cart::{
//!     ClientId, Money, PriceList, ProductItem, ShoppingCartId, ShoppingCartReadModels,
//!     ShoppingCartService,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let read_models = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
//! let service = ShoppingCartService::new(
//!     Arc::new(InMemoryEventStore::new()),
//!     Arc::new(read_models.engine()),
//!     Arc::new(PriceList::new().with_price("A", Money::from_cents(100))),
//!     Arc::new(SystemClock),
//! );
//!
//! let cart_id = ShoppingCartId::new();
//! let opened = service.open(cart_id, ClientId::new()).await?;
//! service
//!     .add_item(cart_id, ProductItem::new("A", 2), Some(opened.version))
//!     .await?;
//!
//! let details = read_models.details(&cart_id).await?.ok_or("no details row")?;
//! assert_eq!(details.total_amount, Money::from_cents(200));
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod pricing;
pub mod projections;
pub mod types;

pub use cart::{CartLine, ShoppingCart};
pub use commands::{ShoppingCartCommand, ShoppingCartOutcome, ShoppingCartService};
pub use config::{ConfigError, ServiceConfig};
pub use errors::{ShoppingCartError, ShoppingCartResult};
pub use events::ShoppingCartEvent;
pub use pricing::{PriceList, ProductPriceCalculator, UniformPrice};
pub use projections::{
    ClientShoppingSummary, ShoppingCartDetails, ShoppingCartReadModels, ShoppingCartShortInfo,
};
pub use types::{ClientId, Money, PricedProductItem, ProductId, ProductItem, ShoppingCartId, ShoppingCartStatus};
