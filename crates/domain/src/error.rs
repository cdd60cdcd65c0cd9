//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;
use crate::payment::PaymentError;
use crate::product::ProductError;
use crate::purchase::PurchaseError;

/// Category of a failure, for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The aggregate or a referenced entity is absent.
    NotFound,
    /// A required field is missing or malformed.
    InvalidArgument,
    /// The transition is illegal from the current status.
    InvalidState,
    /// A natural key is already owned by another aggregate.
    AlreadyExists,
    /// Insufficient stock or an inactive referenced entity.
    NotAvailable,
    /// Another writer committed first; reload and retry.
    ConcurrencyConflict,
    /// Storage or serialization fault.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotAvailable => "not_available",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&EventStoreError> for ErrorKind {
    fn from(err: &EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            EventStoreError::UniqueViolation { .. } => ErrorKind::AlreadyExists,
            EventStoreError::InvalidAppend(_)
            | EventStoreError::Database(_)
            | EventStoreError::Migration(_)
            | EventStoreError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::EventStore(e) => e.into(),
            DomainError::Product(e) => e.kind(),
            DomainError::Cart(e) => e.kind(),
            DomainError::Order(e) => e.kind(),
            DomainError::Payment(e) => e.kind(),
            DomainError::Purchase(e) => e.kind(),
            DomainError::AggregateNotFound { .. } => ErrorKind::NotFound,
            DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found<A: crate::Aggregate>(aggregate_id: impl ToString) -> Self {
        DomainError::AggregateNotFound {
            aggregate_type: A::aggregate_type(),
            aggregate_id: aggregate_id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProductId, cart::CartState};
    use common::AggregateId;
    use event_store::{UniqueKey, Version};

    #[test]
    fn store_errors_are_classified() {
        let conflict = DomainError::from(EventStoreError::ConcurrencyConflict {
            aggregate_id: AggregateId::new(),
            expected: Version::new(1),
            actual: Version::new(2),
        });
        assert_eq!(conflict.kind(), ErrorKind::ConcurrencyConflict);
        assert!(conflict.is_conflict());

        let taken = DomainError::from(EventStoreError::UniqueViolation {
            key: UniqueKey::new("order.cart", "x"),
            existing: None,
        });
        assert_eq!(taken.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn aggregate_errors_are_classified() {
        let err = DomainError::from(ProductError::InsufficientStock {
            product_id: ProductId::new(),
            requested: 2,
            available: 1,
        });
        assert_eq!(err.kind(), ErrorKind::NotAvailable);

        let err = DomainError::from(CartError::InvalidStateTransition {
            current_state: CartState::Confirmed,
            action: crate::cart::CartAction::Delete,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            err.to_string(),
            "Cart error: Invalid state transition: cannot delete from Confirmed state"
        );
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::AlreadyExists.to_string(), "already_exists");
    }
}
