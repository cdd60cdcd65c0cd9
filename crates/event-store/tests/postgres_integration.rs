//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container. Every test works on fresh
//! aggregate ids and key values, so they can run in parallel.
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStoreExt,
    PostgresEventStore, Transaction, UniqueKey, Version,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_events_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn create_test_event(
    aggregate_id: AggregateId,
    version: Version,
    event_type: &str,
) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("TestAggregate")
        .event_type(event_type)
        .version(version)
        .payload_raw(serde_json::json!({"test": true}))
        .build()
        .unwrap()
}

fn fresh_key(scope: &str) -> UniqueKey {
    UniqueKey::new(scope, AggregateId::new())
}

#[tokio::test]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let event = create_test_event(aggregate_id, Version::first(), "TestEvent");
    let version = store
        .append(vec![event], AppendOptions::expect_new())
        .await
        .unwrap();
    assert_eq!(version, Version::first());

    let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "TestEvent");
    assert_eq!(events[0].version, Version::first());
}

#[tokio::test]
async fn optimistic_concurrency_conflict() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![create_test_event(aggregate_id, Version::first(), "Event1")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let result = store
        .append(
            vec![create_test_event(aggregate_id, Version::new(2), "Event2")],
            AppendOptions::expect_version(Version::initial()),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
    assert_eq!(
        store.get_aggregate_version(aggregate_id).await.unwrap(),
        Some(Version::first())
    );
}

#[tokio::test]
async fn commit_across_aggregates_shares_transaction_id() {
    let store = get_test_store().await;
    let product = AggregateId::new();
    let order = AggregateId::new();

    let mut tx = Transaction::new();
    tx.append(
        vec![create_test_event(product, Version::first(), "ProductRegistered")],
        AppendOptions::expect_new(),
    );
    tx.append(
        vec![
            create_test_event(order, Version::new(1), "OrderCreated"),
            create_test_event(order, Version::new(2), "OrderItemAdded"),
        ],
        AppendOptions::expect_new(),
    );
    let tx_id = tx.id();

    let receipt = store.commit(tx).await.unwrap();
    assert_eq!(receipt.version_of(order), Some(Version::new(2)));

    let committed = store.get_events_for_transaction(tx_id).await.unwrap();
    assert_eq!(committed.len(), 3);
    assert!(committed.iter().all(|e| e.transaction_id == tx_id));
}

#[tokio::test]
async fn stale_append_rolls_back_whole_transaction() {
    let store = get_test_store().await;
    let product = AggregateId::new();
    let order = AggregateId::new();

    store
        .append(
            vec![create_test_event(product, Version::first(), "ProductRegistered")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let mut tx = Transaction::new();
    tx.append(
        vec![create_test_event(order, Version::first(), "OrderConfirmed")],
        AppendOptions::expect_new(),
    );
    // Product is at version 1, not 0.
    tx.append(
        vec![create_test_event(product, Version::first(), "StockDecreased")],
        AppendOptions::expect_new(),
    );

    assert!(store.commit(tx).await.unwrap_err().is_conflict());
    assert!(!store.aggregate_exists(order).await.unwrap());
}

#[tokio::test]
async fn unique_claim_collision_reports_owner() {
    let store = get_test_store().await;
    let key = fresh_key("order.cart");
    let owner = AggregateId::new();

    let mut tx = Transaction::new();
    tx.append(
        vec![create_test_event(owner, Version::first(), "OrderCreated")],
        AppendOptions::expect_new(),
    );
    tx.claim(key.clone(), owner);
    store.commit(tx).await.unwrap();
    assert_eq!(store.find_unique(&key).await.unwrap(), Some(owner));

    let rival = AggregateId::new();
    let mut tx = Transaction::new();
    tx.append(
        vec![create_test_event(rival, Version::first(), "OrderCreated")],
        AppendOptions::expect_new(),
    );
    tx.claim(key.clone(), rival);

    let err = store.commit(tx).await.unwrap_err();
    assert!(matches!(
        err,
        EventStoreError::UniqueViolation { existing: Some(existing), .. } if existing == owner
    ));
    assert!(!store.aggregate_exists(rival).await.unwrap());
}

#[tokio::test]
async fn concurrent_claims_have_one_winner() {
    let store = get_test_store().await;
    let key = fresh_key("payment.order");

    let attempts = (0..4).map(|_| {
        let store = store.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let payment = AggregateId::new();
            let mut tx = Transaction::new();
            tx.append(
                vec![create_test_event(payment, Version::first(), "PaymentCreated")],
                AppendOptions::expect_new(),
            );
            tx.claim(key, payment);
            store.commit(tx).await
        })
    });

    let mut committed = 0;
    for handle in attempts.collect::<Vec<_>>() {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert!(err.is_unique_violation_in("payment.order")),
        }
    }
    assert_eq!(committed, 1);
}

#[tokio::test]
async fn aggregate_exists_extension() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    assert!(!store.aggregate_exists(aggregate_id).await.unwrap());

    store
        .append(
            vec![create_test_event(aggregate_id, Version::first(), "Event1")],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    assert!(store.aggregate_exists(aggregate_id).await.unwrap());
}
