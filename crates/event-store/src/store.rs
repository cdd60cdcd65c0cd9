use async_trait::async_trait;

use crate::{
    AggregateId, CommitReceipt, EventEnvelope, EventStoreError, Result, StagedAppend, Transaction,
    TransactionId, UniqueKey, Version,
};

/// Version check applied to a staged append.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the aggregate for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the aggregate to be at `version` when the commit runs.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Persistence boundary for every aggregate.
///
/// Implementations must make [`commit`](EventStore::commit) atomic: all staged
/// appends pass their version checks and all claims are free, or nothing is
/// written.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Commits a transaction.
    ///
    /// Fails with `ConcurrencyConflict` when any append's expected version is
    /// stale and with `UniqueViolation` when any claimed key is taken.
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt>;

    /// Retrieves all events for an aggregate in version order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Retrieves the events committed by one transaction.
    async fn get_events_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Gets the current version of an aggregate, or None if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Returns the aggregate that owns `key`, if any.
    async fn find_unique(&self, key: &UniqueKey) -> Result<Option<AggregateId>>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Commits events for a single aggregate, returning its new version.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;
        let aggregate_id = events[0].aggregate_id;

        let mut transaction = Transaction::new();
        transaction.append(events, options);
        let receipt = self.commit(transaction).await?;

        receipt
            .version_of(aggregate_id)
            .ok_or_else(|| EventStoreError::InvalidAppend("commit returned no version".into()))
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates events before appending.
///
/// All events must target one aggregate and carry consecutive versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "All events must be for the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "Event versions must be sequential. Expected {}, got {}",
                expected_version, event.version
            )));
        }
    }

    Ok(())
}

/// Checks a staged append against the aggregate's `current` version.
///
/// Returns the version the aggregate reaches once the append is written.
pub(crate) fn check_staged_version(staged: &StagedAppend, current: Version) -> Result<Version> {
    validate_events_for_append(&staged.events)?;
    let first = &staged.events[0];
    let aggregate_id = first.aggregate_id;

    if let Some(expected) = staged.options.expected_version
        && current != expected
    {
        return Err(EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual: current,
        });
    }

    // Mirrors the (aggregate_id, version) unique constraint of the SQL schema.
    if first.version != current.next() {
        return Err(EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected: staged.options.expected_version.unwrap_or(current),
            actual: current,
        });
    }

    Ok(staged.events[staged.events.len() - 1].version)
}
