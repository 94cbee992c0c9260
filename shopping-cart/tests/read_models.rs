//! Read models rebuilt from the event log

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use composable_es_core::event::SerializedEvent;
use composable_es_core::event_store::EventStore;
use composable_es_core::projection::{ProjectionError, ProjectionStore};
use composable_es_core::stream::{StreamId, Version};
use composable_es_projections::RebuildReport;
use composable_es_testing::{InMemoryEventStore, InMemoryProjectionStore, test_clock};
use shopping_cart::{
    ClientId, Money, ProductItem, ShoppingCartId, ShoppingCartReadModels, ShoppingCartService,
    UniformPrice,
};
use std::sync::Arc;

fn service(
    events: &Arc<InMemoryEventStore>,
    read_models: &ShoppingCartReadModels<InMemoryProjectionStore>,
) -> ShoppingCartService {
    ShoppingCartService::new(
        events.clone(),
        Arc::new(read_models.engine()),
        Arc::new(UniformPrice(Money::from_cents(100))),
        Arc::new(test_clock()),
    )
}

async fn shop(service: &ShoppingCartService, alice: ClientId, bob: ClientId) {
    let confirmed = ShoppingCartId::new();
    let canceled = ShoppingCartId::new();
    let pending = ShoppingCartId::new();

    service.open(confirmed, alice).await.unwrap();
    service.open(canceled, alice).await.unwrap();
    service.open(pending, bob).await.unwrap();

    service.add_item(confirmed, ProductItem::new("A", 2), None).await.unwrap();
    service.add_item(pending, ProductItem::new("B", 4), None).await.unwrap();
    service.add_item(confirmed, ProductItem::new("B", 1), None).await.unwrap();
    service.add_item(canceled, ProductItem::new("A", 1), None).await.unwrap();
    service.remove_item(confirmed, ProductItem::new("A", 1), None).await.unwrap();
    service.remove_item(pending, ProductItem::new("B", 1), None).await.unwrap();

    service.confirm(confirmed, None).await.unwrap();
    service.cancel(canceled, None).await.unwrap();
}

#[tokio::test]
async fn rebuild_reproduces_incrementally_built_read_models() {
    let events = Arc::new(InMemoryEventStore::new());
    let live = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let (alice, bob) = (ClientId::new(), ClientId::new());
    shop(&service(&events, &live), alice, bob).await;

    let rebuilt = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let report = rebuilt.engine().rebuild(events.as_ref()).await.unwrap();

    assert_eq!(report, RebuildReport { projections: 3, events: 11 });
    assert_eq!(rebuilt.store().snapshot(), live.store().snapshot());

    let summary = rebuilt.client_summary(&alice).await.unwrap().unwrap();
    assert_eq!(summary.confirmed_count, 1);
    assert_eq!(summary.canceled_count, 1);
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.confirmed_amount, Money::from_cents(200));

    let summary = rebuilt.client_summary(&bob).await.unwrap().unwrap();
    assert_eq!(summary.pending_count, 1);
    assert_eq!(summary.pending_items_count, 3);
    assert_eq!(summary.pending_amount, Money::from_cents(300));
}

#[tokio::test]
async fn rebuild_discards_rows_not_backed_by_history() {
    let events = Arc::new(InMemoryEventStore::new());
    let live = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    shop(&service(&events, &live), ClientId::new(), ClientId::new()).await;

    let stale = Arc::new(InMemoryProjectionStore::new());
    stale.save("cart_details:ghost", b"left over").await.unwrap();
    stale.save("client_cart:ghost", b"left over").await.unwrap();
    let rebuilt = ShoppingCartReadModels::new(stale);

    rebuilt.engine().rebuild(events.as_ref()).await.unwrap();

    assert_eq!(rebuilt.store().snapshot(), live.store().snapshot());
}

#[tokio::test]
async fn rebuild_is_repeatable() {
    let events = Arc::new(InMemoryEventStore::new());
    let live = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    shop(&service(&events, &live), ClientId::new(), ClientId::new()).await;

    let engine = live.engine();
    let before = live.store().snapshot();
    engine.rebuild(events.as_ref()).await.unwrap();
    engine.rebuild(events.as_ref()).await.unwrap();

    assert_eq!(live.store().snapshot(), before);
}

#[tokio::test]
async fn rebuild_ignores_other_aggregates_but_not_corrupt_carts() {
    let events = Arc::new(InMemoryEventStore::new());
    let live = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    shop(&service(&events, &live), ClientId::new(), ClientId::new()).await;

    events
        .append_events(
            StreamId::new("invoice-1"),
            Version::INITIAL,
            vec![SerializedEvent::new("InvoiceIssued.v1".to_string(), vec![1])],
        )
        .await
        .unwrap();
    let rebuilt = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let report = rebuilt.engine().rebuild(events.as_ref()).await.unwrap();
    assert_eq!(report.events, 11);

    events
        .append_events(
            StreamId::new("shopping_cart-corrupt"),
            Version::INITIAL,
            vec![SerializedEvent::new("ShoppingCartReopened.v1".to_string(), vec![1])],
        )
        .await
        .unwrap();
    let error = rebuilt.engine().rebuild(events.as_ref()).await.unwrap_err();
    assert!(matches!(error, ProjectionError::Serialization(_)));
}
