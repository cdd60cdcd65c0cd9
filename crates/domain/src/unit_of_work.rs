//! Explicit unit-of-work boundaries.
//!
//! A lifecycle operation begins a [`UnitOfWork`], stages the events of every
//! aggregate it touches, and commits once. Dropping the unit of work without
//! committing discards everything staged, which is how an operation rolls back.

use std::time::Instant;

use common::AggregateId;
use event_store::{
    AppendOptions, CommitReceipt, EventEnvelope, EventStore, Transaction, TransactionId,
    UniqueKey, Version,
};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

#[derive(Debug)]
pub struct UnitOfWork {
    name: &'static str,
    transaction: Transaction,
}

impl UnitOfWork {
    /// Begins a unit of work named after the operation that owns it.
    pub fn begin(name: &'static str) -> Self {
        Self {
            name,
            transaction: Transaction::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.transaction.id()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_empty(&self) -> bool {
        self.transaction.is_empty()
    }

    /// Stages `events` for `aggregate` and applies them to it.
    ///
    /// The append expects the aggregate's current version, so a writer that
    /// committed in between turns the whole commit into a conflict. Staging the
    /// same aggregate twice chains the versions.
    pub fn stage<A: Aggregate>(
        &mut self,
        aggregate_id: AggregateId,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let current = aggregate.version();
        let mut version = current;
        let mut envelopes = Vec::with_capacity(events.len());

        for event in &events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .metadata("unit_of_work", serde_json::json!(self.name))
                .build()?;
            envelopes.push(envelope);
        }

        let options = if current == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current)
        };
        self.transaction.append(envelopes, options);

        aggregate.apply_events(events);
        aggregate.set_version(version);
        Ok(())
    }

    /// Claims a natural key for `owner`; the commit fails if it is taken.
    pub fn claim_unique(&mut self, key: UniqueKey, owner: AggregateId) {
        self.transaction.claim(key, owner);
    }

    /// Commits everything staged, atomically.
    pub async fn commit<S>(self, store: &S) -> Result<CommitReceipt, DomainError>
    where
        S: EventStore + ?Sized,
    {
        let name = self.name;
        let event_count = self.transaction.event_count();
        let started = Instant::now();

        let result = store.commit(self.transaction).await;
        metrics::histogram!("unit_of_work_commit_seconds", "unit" => name)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(receipt) => {
                tracing::debug!(
                    unit = name,
                    transaction_id = %receipt.transaction_id,
                    event_count,
                    "unit of work committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if err.is_conflict() {
                    metrics::counter!("unit_of_work_conflicts_total", "unit" => name).increment(1);
                }
                tracing::debug!(unit = name, error = %err, "unit of work rejected");
                Err(err.into())
            }
        }
    }
}
