//! Order aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::Order;
pub use events::{
    OrderCanceledData, OrderConfirmedData, OrderCreatedData, OrderDeliveredData, OrderEvent,
    OrderPaidData, OrderShippedData,
};
pub use state::{OrderAction, OrderState};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{LineError, Money};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order already created")]
    AlreadyCreated,

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderState,
        action: OrderAction,
    },

    /// The paid amount differs from the order total.
    #[error("Payment amount {paid} does not match order total {total}")]
    AmountMismatch { total: Money, paid: Money },

    #[error(transparent)]
    Line(#[from] LineError),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::AlreadyCreated => ErrorKind::AlreadyExists,
            OrderError::NoItems | OrderError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidState
            }
            OrderError::AmountMismatch { .. } => ErrorKind::InvalidArgument,
            OrderError::Line(e) => e.kind(),
        }
    }
}
