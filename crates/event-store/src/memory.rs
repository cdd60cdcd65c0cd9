use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, CommitReceipt, EventEnvelope, EventStoreError, Result, Transaction,
    TransactionId, UniqueKey, Version,
    store::{EventStore, check_staged_version},
};

#[derive(Default)]
struct MemoryState {
    events: Vec<EventEnvelope>,
    versions: HashMap<AggregateId, Version>,
    unique_keys: HashMap<UniqueKey, AggregateId>,
}

impl MemoryState {
    fn current_version(&self, aggregate_id: AggregateId) -> Version {
        self.versions
            .get(&aggregate_id)
            .copied()
            .unwrap_or(Version::initial())
    }
}

/// In-memory event store.
///
/// A single lock guards events, versions and unique keys, so a commit is
/// checked and applied as one step. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Returns every stored event of the given type, in commit order.
    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt> {
        let (transaction_id, appends, claims) = transaction.into_parts();
        let mut state = self.state.write().await;

        // Check everything before touching the state.
        let mut reached: HashMap<AggregateId, Version> = HashMap::new();
        for staged in &appends {
            let Some(aggregate_id) = staged.aggregate_id() else {
                return Err(EventStoreError::InvalidAppend(
                    "Cannot append empty event list".to_string(),
                ));
            };
            let current = reached
                .get(&aggregate_id)
                .copied()
                .unwrap_or_else(|| state.current_version(aggregate_id));
            let next = check_staged_version(staged, current)?;
            reached.insert(aggregate_id, next);
        }

        let mut claimed = HashSet::new();
        for (key, _) in &claims {
            if let Some(existing) = state.unique_keys.get(key) {
                return Err(EventStoreError::UniqueViolation {
                    key: key.clone(),
                    existing: Some(*existing),
                });
            }
            if !claimed.insert(key.clone()) {
                return Err(EventStoreError::UniqueViolation {
                    key: key.clone(),
                    existing: None,
                });
            }
        }

        for staged in appends {
            state.events.extend(staged.events);
        }
        for (aggregate_id, version) in &reached {
            state.versions.insert(*aggregate_id, *version);
        }
        for (key, owner) in claims {
            state.unique_keys.insert(key, owner);
        }

        Ok(CommitReceipt {
            transaction_id,
            versions: reached,
        })
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.state.read().await.versions.get(&aggregate_id).copied())
    }

    async fn find_unique(&self, key: &UniqueKey) -> Result<Option<AggregateId>> {
        Ok(self.state.read().await.unique_keys.get(key).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppendOptions, EventStoreExt};

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

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let event = create_test_event(aggregate_id, Version::first(), "TestEvent");

        let version = store
            .append(vec![event], AppendOptions::expect_new())
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version() {
        let store = InMemoryEventStore::new();
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
                vec![create_test_event(aggregate_id, Version::first(), "Event1b")],
                AppendOptions::expect_new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::initial() && actual == Version::first()
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn commit_spans_aggregates_atomically() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let mut tx = Transaction::new();
        tx.append(
            vec![create_test_event(a, Version::first(), "A1")],
            AppendOptions::expect_new(),
        );
        tx.append(
            vec![create_test_event(b, Version::first(), "B1")],
            AppendOptions::expect_new(),
        );
        let tx_id = tx.id();

        let receipt = store.commit(tx).await.unwrap();
        assert_eq!(receipt.version_of(a), Some(Version::first()));
        assert_eq!(receipt.version_of(b), Some(Version::first()));

        let committed = store.get_events_for_transaction(tx_id).await.unwrap();
        assert_eq!(committed.len(), 2);
    }

    #[tokio::test]
    async fn failed_check_writes_nothing() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let mut tx = Transaction::new();
        tx.append(
            vec![create_test_event(a, Version::first(), "A1")],
            AppendOptions::expect_new(),
        );
        // b has no events, so expecting version 1 is stale
        tx.append(
            vec![create_test_event(b, Version::new(2), "B2")],
            AppendOptions::expect_version(Version::first()),
        );

        assert!(store.commit(tx).await.unwrap_err().is_conflict());
        assert_eq!(store.event_count().await, 0);
        assert!(!store.aggregate_exists(a).await.unwrap());
    }

    #[tokio::test]
    async fn chained_appends_on_same_aggregate() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();

        let mut tx = Transaction::new();
        tx.append(
            vec![create_test_event(a, Version::first(), "A1")],
            AppendOptions::expect_new(),
        );
        tx.append(
            vec![create_test_event(a, Version::new(2), "A2")],
            AppendOptions::expect_version(Version::first()),
        );

        let receipt = store.commit(tx).await.unwrap();
        assert_eq!(receipt.version_of(a), Some(Version::new(2)));
        assert_eq!(
            store.get_aggregate_version(a).await.unwrap(),
            Some(Version::new(2))
        );
    }

    #[tokio::test]
    async fn unique_claims_are_exclusive() {
        let store = InMemoryEventStore::new();
        let key = UniqueKey::new("order.cart", "cart-1");
        let first_owner = AggregateId::new();

        let mut tx = Transaction::new();
        tx.claim(key.clone(), first_owner);
        store.commit(tx).await.unwrap();
        assert_eq!(store.find_unique(&key).await.unwrap(), Some(first_owner));

        let loser = AggregateId::new();
        let mut tx = Transaction::new();
        tx.append(
            vec![create_test_event(loser, Version::first(), "OrderCreated")],
            AppendOptions::expect_new(),
        );
        tx.claim(key.clone(), loser);

        let err = store.commit(tx).await.unwrap_err();
        assert!(err.is_unique_violation_in("order.cart"));
        assert!(matches!(
            err,
            EventStoreError::UniqueViolation { existing: Some(owner), .. } if owner == first_owner
        ));
        // The append staged alongside the losing claim was not written.
        assert!(!store.aggregate_exists(loser).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_claim_within_one_transaction() {
        let store = InMemoryEventStore::new();
        let key = UniqueKey::new("purchase.document", "INV-7");

        let mut tx = Transaction::new();
        tx.claim(key.clone(), AggregateId::new());
        tx.claim(key.clone(), AggregateId::new());

        assert!(store.commit(tx).await.unwrap_err().is_unique_violation_in("purchase.document"));
        assert_eq!(store.find_unique(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn events_of_type_filters() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                vec![
                    create_test_event(id, Version::new(1), "PaymentFailed"),
                    create_test_event(id, Version::new(2), "PaymentRetried"),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(store.events_of_type("PaymentFailed").await.len(), 1);
        assert!(store.events_of_type("PaymentCompleted").await.is_empty());
    }
}
