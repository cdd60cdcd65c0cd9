//! Runs the binary's walkthrough against the in-memory store.

use app::walkthrough;
use domain::{Money, OrderState, PaymentState, PurchaseState};
use event_store::{EventStore, InMemoryEventStore};
use lifecycle::LifecycleConfig;

#[tokio::test]
async fn walkthrough_delivers_a_paid_order() {
    let store = InMemoryEventStore::new();

    let summary = walkthrough::run(store.clone(), LifecycleConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.order_state, OrderState::Delivered);
    assert_eq!(summary.payment_state, PaymentState::Completed);
    assert_eq!(summary.purchase_state, PurchaseState::Closed);
    assert_eq!(summary.order_total, Money::from_cents(4999 + 2 * 1999));
    assert_eq!(
        summary.stock,
        vec![("Keyboard".to_string(), 9), ("Mouse".to_string(), 3)]
    );

    let order_events = store
        .get_events_for_aggregate(summary.order_id)
        .await
        .unwrap();
    let types: Vec<_> = order_events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "OrderCreated",
            "OrderConfirmed",
            "OrderPaid",
            "OrderShipped",
            "OrderDelivered"
        ]
    );
}

#[tokio::test]
async fn walkthrough_runs_twice_on_one_store() {
    let store = InMemoryEventStore::new();

    let first = walkthrough::run(store.clone(), LifecycleConfig::default())
        .await
        .unwrap();
    let second = walkthrough::run(store, LifecycleConfig::default())
        .await
        .unwrap();

    assert_ne!(first.order_id, second.order_id);
}
