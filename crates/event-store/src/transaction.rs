//! Multi-aggregate transactions.
//!
//! A [`Transaction`] collects appends for any number of aggregates plus
//! uniqueness claims. [`EventStore::commit`](crate::EventStore::commit) writes
//! all of it or none of it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AggregateId, AppendOptions, EventEnvelope, Version};

/// Identifier shared by every event committed in one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A natural key that at most one aggregate may own, e.g. the cart an order
/// was created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    scope: String,
    value: String,
}

impl UniqueKey {
    pub fn new(scope: impl Into<String>, value: impl ToString) -> Self {
        Self {
            scope: scope.into(),
            value: value.to_string(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.scope, self.value)
    }
}

/// Events for a single aggregate, with the version check to apply at commit.
#[derive(Debug, Clone)]
pub struct StagedAppend {
    pub events: Vec<EventEnvelope>,
    pub options: AppendOptions,
}

impl StagedAppend {
    /// The aggregate the events belong to.
    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.events.first().map(|e| e.aggregate_id)
    }
}

/// Pending writes that commit atomically.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    id: TransactionId,
    appends: Vec<StagedAppend>,
    claims: Vec<(UniqueKey, AggregateId)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Stages events for one aggregate, stamping them with this transaction's id.
    pub fn append(&mut self, mut events: Vec<EventEnvelope>, options: AppendOptions) {
        for event in &mut events {
            event.transaction_id = self.id;
        }
        self.appends.push(StagedAppend { events, options });
    }

    /// Stages a claim of `key` by `owner`.
    pub fn claim(&mut self, key: UniqueKey, owner: AggregateId) {
        self.claims.push((key, owner));
    }

    pub fn appends(&self) -> &[StagedAppend] {
        &self.appends
    }

    pub fn claims(&self) -> &[(UniqueKey, AggregateId)] {
        &self.claims
    }

    pub fn is_empty(&self) -> bool {
        self.appends.is_empty() && self.claims.is_empty()
    }

    /// Total number of staged events across all aggregates.
    pub fn event_count(&self) -> usize {
        self.appends.iter().map(|a| a.events.len()).sum()
    }

    pub fn into_parts(self) -> (TransactionId, Vec<StagedAppend>, Vec<(UniqueKey, AggregateId)>) {
        (self.id, self.appends, self.claims)
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub transaction_id: TransactionId,

    /// The version each touched aggregate reached.
    pub versions: HashMap<AggregateId, Version>,
}

impl CommitReceipt {
    pub fn version_of(&self, aggregate_id: AggregateId) -> Option<Version> {
        self.versions.get(&aggregate_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Test")
            .event_type("Tested")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn append_stamps_transaction_id() {
        let mut tx = Transaction::new();
        let id = AggregateId::new();
        tx.append(vec![envelope(id, 1), envelope(id, 2)], AppendOptions::expect_new());

        assert_eq!(tx.event_count(), 2);
        assert!(tx.appends()[0].events.iter().all(|e| e.transaction_id == tx.id()));
        assert_eq!(tx.appends()[0].aggregate_id(), Some(id));
    }

    #[test]
    fn empty_until_something_is_staged() {
        let mut tx = Transaction::new();
        assert!(tx.is_empty());

        tx.claim(UniqueKey::new("order.cart", "c-1"), AggregateId::new());
        assert!(!tx.is_empty());
        assert_eq!(tx.event_count(), 0);
    }

    #[test]
    fn unique_key_display() {
        let key = UniqueKey::new("payment.order", 42);
        assert_eq!(key.to_string(), "payment.order=42");
        assert_eq!(key.scope(), "payment.order");
        assert_eq!(key.value(), "42");
    }
}
