//! End-to-end cart scenarios through `ShoppingCartService`

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use composable_es_core::aggregate::Aggregate;
use composable_es_core::environment::Clock;
use composable_es_core::error::CommandError;
use composable_es_core::event_store::EventStore;
use composable_es_core::stream::Version;
use composable_es_testing::{InMemoryEventStore, InMemoryProjectionStore, test_clock};
use shopping_cart::{
    ClientId, Money, PriceList, ProductId, ProductItem, ShoppingCart, ShoppingCartCommand,
    ShoppingCartError, ShoppingCartEvent, ShoppingCartReadModels, ShoppingCartService,
    ShoppingCartId, ShoppingCartStatus,
};
use std::sync::Arc;

struct App {
    events: Arc<InMemoryEventStore>,
    read_models: ShoppingCartReadModels<InMemoryProjectionStore>,
    service: ShoppingCartService,
}

fn app() -> App {
    let clock = Arc::new(test_clock());
    let events = Arc::new(InMemoryEventStore::new().with_clock(clock.clone()));
    let read_models = ShoppingCartReadModels::new(Arc::new(InMemoryProjectionStore::new()));
    let prices = PriceList::new()
        .with_price("A", Money::from_cents(100))
        .with_price("B", Money::from_cents(250));
    let service = ShoppingCartService::new(
        events.clone(),
        Arc::new(read_models.engine()),
        Arc::new(prices),
        clock,
    );
    App {
        events,
        read_models,
        service,
    }
}

impl App {
    fn version_of(&self, cart_id: ShoppingCartId) -> Version {
        self.events.stream_version(&ShoppingCart::stream_id(&cart_id))
    }
}

#[tokio::test]
async fn open_creates_a_pending_empty_cart_at_version_1() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    let client_id = ClientId::new();

    let outcome = app.service.open(cart_id, client_id).await.unwrap();

    assert_eq!(outcome.version, Version::new(1));
    let (cart, version) = app.service.get(cart_id).await.unwrap();
    assert_eq!(version, Version::new(1));
    assert_eq!(cart.status(), ShoppingCartStatus::Pending);
    assert_eq!(cart.client_id(), Some(&client_id));
    assert!(cart.lines().is_empty());
    assert_eq!(cart.opened_at(), Some(test_clock().now()));
}

#[tokio::test]
async fn repeated_additions_sum_quantities() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();

    app.service
        .add_item(cart_id, ProductItem::new("A", 2), Some(Version::new(1)))
        .await
        .unwrap();
    let outcome = app
        .service
        .add_item(cart_id, ProductItem::new("A", 1), Some(Version::new(2)))
        .await
        .unwrap();

    assert_eq!(outcome.version, Version::new(3));
    let (cart, _) = app.service.get(cart_id).await.unwrap();
    let line = cart.lines()[&ProductId::new("A")];
    assert_eq!(line.quantity, 3);
    assert_eq!(line.unit_price, Money::from_cents(100));
}

#[tokio::test]
async fn emptied_cart_cannot_be_confirmed() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 3), None)
        .await
        .unwrap();

    app.service
        .remove_item(cart_id, ProductItem::new("A", 3), None)
        .await
        .unwrap();
    let (cart, _) = app.service.get(cart_id).await.unwrap();
    assert!(cart.lines().is_empty());

    let error = app.service.confirm(cart_id, None).await.unwrap_err();
    assert_eq!(error.rejection(), Some(&ShoppingCartError::Empty));
    assert_eq!(app.version_of(cart_id), Version::new(3));
}

#[tokio::test]
async fn confirmed_cart_cannot_be_canceled() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 1), None)
        .await
        .unwrap();
    app.service.confirm(cart_id, None).await.unwrap();

    let (cart, _) = app.service.get(cart_id).await.unwrap();
    assert_eq!(cart.status(), ShoppingCartStatus::Confirmed);

    let error = app.service.cancel(cart_id, None).await.unwrap_err();
    assert!(error.is_validation());
    assert_eq!(
        error.rejection(),
        Some(&ShoppingCartError::Closed {
            status: ShoppingCartStatus::Confirmed
        })
    );
}

#[tokio::test]
async fn concurrent_units_of_work_on_one_version_admit_one_winner() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();

    let mut first = app.service.load(cart_id).await.unwrap();
    let mut second = app.service.load(cart_id).await.unwrap();
    assert_eq!(first.version(), Version::new(1));
    assert_eq!(second.version(), Version::new(1));

    let now = test_clock().now();
    let prices = PriceList::new().with_price("A", Money::from_cents(100));
    first
        .execute(|cart| cart.add_item(&ProductItem::new("A", 1), &prices, now))
        .unwrap();
    second
        .execute(|cart| cart.add_item(&ProductItem::new("A", 5), &prices, now))
        .unwrap();

    let won = app.service.commit(&mut first).await.unwrap();
    let lost = app.service.commit(&mut second).await.unwrap_err();

    assert_eq!(won.version, Version::new(2));
    assert!(matches!(
        lost,
        CommandError::ConcurrencyConflict { expected, actual, .. }
            if expected == Version::new(1) && actual == Version::new(2)
    ));
    let (cart, _) = app.service.get(cart_id).await.unwrap();
    assert_eq!(cart.quantity_of(&ProductId::new("A")), 1);
}

#[tokio::test]
async fn over_removal_leaves_the_stream_untouched() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 2), None)
        .await
        .unwrap();

    let error = app
        .service
        .remove_item(cart_id, ProductItem::new("A", 3), Some(Version::new(2)))
        .await
        .unwrap_err();

    assert!(matches!(
        error.rejection(),
        Some(ShoppingCartError::InsufficientQuantity { requested: 3, available: 2, .. })
    ));
    assert_eq!(app.version_of(cart_id), Version::new(2));
}

#[tokio::test]
async fn additions_past_the_unit_limit_leave_the_stream_untouched() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", u32::MAX), None)
        .await
        .unwrap();

    let error = app
        .service
        .add_item(cart_id, ProductItem::new("A", 1), None)
        .await
        .unwrap_err();

    assert!(error.is_validation());
    assert_eq!(
        error.rejection(),
        Some(&ShoppingCartError::QuantityOverflow {
            product_id: ProductId::new("A"),
            requested: 1,
            in_cart: u32::MAX,
        })
    );
    assert_eq!(app.version_of(cart_id), Version::new(2));
    let (cart, _) = app.service.get(cart_id).await.unwrap();
    assert_eq!(cart.quantity_of(&ProductId::new("A")), u32::MAX);
    let details = app.read_models.details(&cart_id).await.unwrap().unwrap();
    assert_eq!(details.total_items_count, u32::MAX);
    assert_eq!(details.total_amount, Money::from_cents(100 * i64::from(u32::MAX)));
}

#[tokio::test]
async fn concurrent_opens_of_one_cart_admit_one_winner() {
    let app = app();
    let cart_id = ShoppingCartId::new();

    let mut first = app.service.load(cart_id).await.unwrap();
    let mut second = app.service.load(cart_id).await.unwrap();
    let now = test_clock().now();
    first
        .execute(|cart| cart.open(cart_id, ClientId::new(), now))
        .unwrap();
    second
        .execute(|cart| cart.open(cart_id, ClientId::new(), now))
        .unwrap();

    app.service.commit(&mut first).await.unwrap();
    let error = app.service.commit(&mut second).await.unwrap_err();

    assert!(error.is_conflict());
    let retried = app.service.open(cart_id, ClientId::new()).await.unwrap_err();
    assert_eq!(retried.rejection(), Some(&ShoppingCartError::AlreadyOpened));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_commands_with_the_same_expected_version_admit_one_winner() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    let service = Arc::new(app.service.clone());

    let barrier = Arc::new(tokio::sync::Barrier::new(8));
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let mut root = service.load(cart_id).await?;
                root.execute(|cart| {
                    cart.add_item(
                        &ProductItem::new("A", 1),
                        &PriceList::new().with_price("A", Money::from_cents(100)),
                        test_clock().now(),
                    )
                })
                .map_err(CommandError::Validation)?;
                barrier.wait().await;
                Ok::<_, CommandError<ShoppingCartError>>(service.commit(&mut root).await?)
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.as_ref().is_err_and(|e| e.is_conflict()))
            .count(),
        7
    );
    assert_eq!(app.version_of(cart_id), Version::new(2));
}

#[tokio::test]
async fn stale_caller_version_is_a_conflict() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    let opened = app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 1), Some(opened.version))
        .await
        .unwrap();

    let error = app
        .service
        .handle(ShoppingCartCommand::Confirm {
            cart_id,
            expected_version: Some(opened.version),
        })
        .await
        .unwrap_err();

    assert!(error.is_conflict());
    assert_eq!(app.version_of(cart_id), Version::new(2));
}

#[tokio::test]
async fn commands_on_unknown_carts_are_not_found() {
    let app = app();

    let error = app
        .service
        .add_item(ShoppingCartId::new(), ProductItem::new("A", 1), None)
        .await
        .unwrap_err();

    assert!(error.is_not_found());
    assert_eq!(app.events.event_count(), 0);
}

#[tokio::test]
async fn unpriced_product_is_a_validation_error() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();

    let error = app
        .service
        .add_item(cart_id, ProductItem::new("Z", 1), None)
        .await
        .unwrap_err();

    assert_eq!(
        error.rejection(),
        Some(&ShoppingCartError::PriceNotFound(ProductId::new("Z")))
    );
}

#[tokio::test]
async fn stored_events_carry_the_clock_time_and_kinds() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("B", 2), None)
        .await
        .unwrap();

    let stream = app
        .events
        .load_events(ShoppingCart::stream_id(&cart_id))
        .await
        .unwrap();

    let kinds: Vec<_> = stream.events.iter().map(|r| r.event.event_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["ShoppingCartOpened.v1", "ProductItemAddedToShoppingCart.v1"]
    );
    let added: ShoppingCartEvent = stream.events[1].decode().unwrap();
    assert_eq!(added.occurred_at(), test_clock().now());
    assert_eq!(stream.events[1].recorded_at, test_clock().now());
}

#[tokio::test]
async fn read_models_follow_the_commands() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    let client_id = ClientId::new();
    app.service.open(cart_id, client_id).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 2), None)
        .await
        .unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("B", 1), None)
        .await
        .unwrap();

    let short = app.read_models.short_info(&cart_id).await.unwrap().unwrap();
    assert_eq!(short.total_items_count, 3);
    assert_eq!(short.total_amount, Money::from_cents(450));

    app.service.confirm(cart_id, None).await.unwrap();

    let details = app.read_models.details(&cart_id).await.unwrap().unwrap();
    assert_eq!(details.status, ShoppingCartStatus::Confirmed);
    assert_eq!(details.confirmed_at, Some(test_clock().now()));
    assert_eq!(details.events_applied, 4);
    assert_eq!(app.read_models.short_info(&cart_id).await.unwrap(), None);

    let summary = app.read_models.client_summary(&client_id).await.unwrap().unwrap();
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.confirmed_count, 1);
    assert_eq!(summary.confirmed_amount, Money::from_cents(450));
    assert_eq!(summary.pending_items_count, 0);
}

#[tokio::test]
async fn rejected_commands_do_not_reach_the_read_models() {
    let app = app();
    let cart_id = ShoppingCartId::new();
    app.service.open(cart_id, ClientId::new()).await.unwrap();
    app.service
        .add_item(cart_id, ProductItem::new("A", 1), None)
        .await
        .unwrap();

    app.service
        .remove_item(cart_id, ProductItem::new("A", 4), None)
        .await
        .unwrap_err();

    let details = app.read_models.details(&cart_id).await.unwrap().unwrap();
    assert_eq!(details.total_items_count, 1);
    assert_eq!(details.events_applied, 2);
}
