//! Supplier purchase aggregate and related types.

mod aggregate;
mod events;
mod state;

pub use aggregate::{Purchase, ReceivedLine};
pub use events::{
    PurchaseClosedData, PurchaseConfirmedData, PurchaseCreatedData, PurchaseEvent,
    PurchaseReceivedData, PurchaseRescheduledData,
};
pub use state::{PurchaseAction, PurchaseState};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::LineError;

/// Longest document number, in characters, once surrounding whitespace is trimmed.
pub const MAX_DOCUMENT_NUMBER_LEN: usize = 255;

/// Errors that can occur during purchase operations.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Purchase already created")]
    AlreadyCreated,

    #[error("Document number is required")]
    DocumentNumberRequired,

    #[error("Document number is {length} characters long, the limit is {max}")]
    DocumentNumberTooLong { length: usize, max: usize },

    #[error("Purchase has no items")]
    NoItems,

    /// What arrived differs from what was confirmed.
    #[error("Received items do not match the purchase: {reason}")]
    ReceiptMismatch { reason: String },

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: PurchaseState,
        action: PurchaseAction,
    },

    #[error(transparent)]
    Line(#[from] LineError),
}

impl PurchaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PurchaseError::AlreadyCreated => ErrorKind::AlreadyExists,
            PurchaseError::DocumentNumberRequired
            | PurchaseError::DocumentNumberTooLong { .. }
            | PurchaseError::ReceiptMismatch { .. } => ErrorKind::InvalidArgument,
            PurchaseError::NoItems | PurchaseError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidState
            }
            PurchaseError::Line(e) => e.kind(),
        }
    }
}
