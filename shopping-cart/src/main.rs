//! Shopping cart demo.
//!
//! Runs a cart through its lifecycle against the in-memory event and
//! projection stores, forces a concurrency conflict, resolves it with a retry
//! and finally rebuilds every read model from the event log.

use anyhow::{Context, Result};
use composable_es_core::environment::SystemClock;
use composable_es_runtime::retry_on_conflict;
use composable_es_testing::{InMemoryEventStore, InMemoryProjectionStore};
use shopping_cart::{
    ClientId, Money, PriceList, ProductItem, ServiceConfig, ShoppingCartCommand,
    ShoppingCartReadModels, ShoppingCartService, ShoppingCartId,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_target(false)
        .init();

    info!("=== Shopping Cart Example ===");

    let event_store = Arc::new(InMemoryEventStore::new());
    let read_models = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let prices = PriceList::new()
        .with_price("coffee", Money::from_cents(1_250))
        .with_price("mug", Money::from_cents(899))
        .with_price("filter", Money::from_cents(450));

    let service = ShoppingCartService::new(
        event_store.clone(),
        Arc::new(read_models.engine()),
        Arc::new(prices),
        Arc::new(SystemClock),
    );

    let client_id = ClientId::new();
    let cart_id = ShoppingCartId::new();

    // Happy path, carrying the version from each response into the next command
    let opened = service.open(cart_id, client_id).await?;
    info!(cart_id = %cart_id, version = %opened.version, "Opened cart");

    let added = service
        .handle(ShoppingCartCommand::AddItem {
            cart_id,
            item: ProductItem::new("coffee", 2),
            expected_version: Some(opened.version),
        })
        .await?;
    let added = service
        .add_item(cart_id, ProductItem::new("mug", 1), Some(added.version))
        .await?;
    info!(version = %added.version, "Added coffee and a mug");

    // A stale version is refused
    match service
        .remove_item(cart_id, ProductItem::new("coffee", 1), Some(opened.version))
        .await
    {
        Err(error) if error.is_conflict() => warn!(%error, "Stale update refused"),
        other => anyhow::bail!("Expected a concurrency conflict, got {other:?}"),
    }

    // Two units of work race on the same version; the loser retries
    let mut first = service.load(cart_id).await?;
    let mut second = service.load(cart_id).await?;
    first.execute(|cart| cart.remove_item(&ProductItem::new("mug", 1), chrono::Utc::now()))?;
    second.execute(|cart| cart.remove_item(&ProductItem::new("coffee", 1), chrono::Utc::now()))?;
    service.commit(&mut first).await?;
    match service.commit(&mut second).await {
        Err(error) if error.is_conflict() => {
            warn!(%error, "Lost the race, resubmitting");
            let outcome = retry_on_conflict(config.retry_policy(), || {
                service.remove_item(cart_id, ProductItem::new("coffee", 1), None)
            })
            .await?;
            info!(version = %outcome.version, "Resubmitted after reload");
        }
        other => anyhow::bail!("Expected the second commit to conflict, got {other:?}"),
    }

    let (cart, version) = service.get(cart_id).await?;
    info!(
        version = %version,
        items = cart.total_items(),
        total = %cart.total_amount(),
        "Cart before checkout"
    );

    // Over-removal is rejected without touching the stream
    if let Err(error) = service
        .remove_item(cart_id, ProductItem::new("coffee", 5), Some(version))
        .await
    {
        warn!(%error, "Rejected");
    }

    let confirmed = service.confirm(cart_id, Some(version)).await?;
    info!(version = %confirmed.version, "Confirmed cart");

    if let Err(error) = service.cancel(cart_id, None).await {
        warn!(%error, "Closed carts stay closed");
    }

    // A second cart for the same client, abandoned
    let abandoned = ShoppingCartId::new();
    service.open(abandoned, client_id).await?;
    service
        .add_item(abandoned, ProductItem::new("filter", 3), None)
        .await?;
    service.cancel(abandoned, None).await?;

    let details = read_models
        .details(&cart_id)
        .await?
        .context("Missing cart details")?;
    info!(
        status = %details.status,
        items = details.total_items_count,
        total = %details.total_amount,
        events = details.events_applied,
        "Cart details"
    );
    let short_info = read_models.short_info(&cart_id).await?;
    info!(?short_info, "Short info after checkout");

    let summary = read_models
        .client_summary(&client_id)
        .await?
        .context("Missing client summary")?;
    info!(
        confirmed = summary.confirmed_count,
        canceled = summary.canceled_count,
        pending = summary.pending_count,
        revenue = %summary.confirmed_amount,
        "Client summary"
    );

    // Rebuild every read model from the log and compare
    let rebuilt = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let report = rebuilt.engine().rebuild(event_store.as_ref()).await?;
    info!(
        projections = report.projections,
        events = report.events,
        "Rebuilt read models"
    );
    anyhow::ensure!(
        rebuilt.store().snapshot() == read_models.store().snapshot(),
        "Rebuilt read models differ from the incrementally built ones"
    );
    info!("Rebuilt read models match");

    Ok(())
}
