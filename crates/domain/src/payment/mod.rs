//! Payment aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::{Confirmation, Payment, PaymentPolicy};
pub use events::{
    PaymentCompletedData, PaymentCreatedData, PaymentEvent, PaymentExpiredData,
    PaymentFailedData, PaymentMethodChangedData, PaymentRetriedData,
};
pub use state::{ExpiryReason, PaymentAction, PaymentMethod, PaymentState};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::Money;

/// Errors that can occur during payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment already created")]
    AlreadyCreated,

    #[error("Invalid payment amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: Money },

    /// The payment amount differs from the order's current total.
    #[error("Payment amount {actual} does not match order total {expected}")]
    AmountMismatch { expected: Money, actual: Money },

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: PaymentState,
        action: PaymentAction,
    },
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::AlreadyCreated => ErrorKind::AlreadyExists,
            PaymentError::InvalidAmount { .. } | PaymentError::AmountMismatch { .. } => {
                ErrorKind::InvalidArgument
            }
            PaymentError::InvalidStateTransition { .. } => ErrorKind::InvalidState,
        }
    }
}
