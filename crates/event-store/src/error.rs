use thiserror::Error;

use crate::{AggregateId, UniqueKey, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The expected version did not match the stored version.
    ///
    /// Another writer committed to the aggregate after the caller last read it.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// A uniqueness claim collided with a key already owned by another aggregate.
    #[error("Unique key {key} is already claimed")]
    UniqueViolation {
        key: UniqueKey,
        existing: Option<AggregateId>,
    },

    /// A staged append was malformed (mixed aggregates, gaps in versions, empty).
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true when the error is an optimistic version mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }

    /// Returns true when the error is a uniqueness collision on `scope`.
    pub fn is_unique_violation_in(&self, scope: &str) -> bool {
        matches!(self, EventStoreError::UniqueViolation { key, .. } if key.scope() == scope)
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
