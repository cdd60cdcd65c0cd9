//! Cart aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::Cart;
pub use events::{
    CartAbandonedData, CartCheckedOutData, CartConfirmedData, CartCreatedData, CartDeletedData,
    CartEvent, CartReactivatedData,
};
pub use state::{CartAction, CartState};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::LineError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart already created")]
    AlreadyCreated,

    #[error("Cart has no items")]
    NoItems,

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: CartState,
        action: CartAction,
    },

    #[error(transparent)]
    Line(#[from] LineError),
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::AlreadyCreated => ErrorKind::AlreadyExists,
            CartError::NoItems | CartError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidState
            }
            CartError::Line(e) => e.kind(),
        }
    }
}
