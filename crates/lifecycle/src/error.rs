//! Lifecycle error types.

use common::{AggregateId, CustomerId, SupplierId};
use domain::{
    CartError, CartState, DomainError, ErrorKind, OrderError, OrderState, PaymentError,
    ProductError, PurchaseError,
};
use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// An aggregate rejected the command, or the store rejected the commit.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Customer {0} is inactive")]
    CustomerInactive(CustomerId),

    #[error("Supplier not found: {0}")]
    SupplierNotFound(SupplierId),

    #[error("Supplier {0} is inactive")]
    SupplierInactive(SupplierId),

    /// Only a checked-out cart can become an order.
    #[error("Cart {cart_id} is {state}, expected CheckedOut")]
    CartNotCheckedOut { cart_id: AggregateId, state: CartState },

    /// Payments are taken for confirmed orders only.
    #[error("Order {order_id} is {state}, expected Confirmed")]
    OrderNotConfirmed {
        order_id: AggregateId,
        state: OrderState,
    },

    #[error("An order already exists for cart {cart_id}")]
    OrderAlreadyExists {
        cart_id: AggregateId,
        existing: Option<AggregateId>,
    },

    #[error("A payment already exists for order {order_id}")]
    PaymentAlreadyExists {
        order_id: AggregateId,
        existing: Option<AggregateId>,
    },

    #[error("Purchase document {document_number} is already registered")]
    DuplicateDocument { document_number: String },

    /// The customer/supplier directory could not be reached.
    #[error("Directory error: {0}")]
    Directory(String),
}

macro_rules! via_domain {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for LifecycleError {
                fn from(err: $source) -> Self {
                    LifecycleError::Domain(err.into())
                }
            }
        )*
    };
}

via_domain!(
    EventStoreError,
    ProductError,
    CartError,
    OrderError,
    PaymentError,
    PurchaseError,
);

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Domain(e) => e.kind(),
            LifecycleError::CustomerNotFound(_) | LifecycleError::SupplierNotFound(_) => {
                ErrorKind::NotFound
            }
            LifecycleError::CustomerInactive(_) | LifecycleError::SupplierInactive(_) => {
                ErrorKind::NotAvailable
            }
            LifecycleError::CartNotCheckedOut { .. } | LifecycleError::OrderNotConfirmed { .. } => {
                ErrorKind::InvalidState
            }
            LifecycleError::OrderAlreadyExists { .. }
            | LifecycleError::PaymentAlreadyExists { .. }
            | LifecycleError::DuplicateDocument { .. } => ErrorKind::AlreadyExists,
            LifecycleError::Directory(_) => ErrorKind::Internal,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
