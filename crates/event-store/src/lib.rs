pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod transaction;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt};
pub use transaction::{CommitReceipt, StagedAppend, Transaction, TransactionId, UniqueKey};
