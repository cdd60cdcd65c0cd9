//! Product aggregate: the subject of the inventory guard.

mod aggregate;
mod events;
mod state;

pub use aggregate::Product;
pub use events::{
    ProductEliminatedData, ProductEvent, ProductRegisteredData, StockDecreasedData,
    StockIncreasedData,
};
pub use state::{ProductAction, ProductStatus};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{Money, ProductId};

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product already registered")]
    AlreadyRegistered,

    #[error("Product name is required")]
    NameRequired,

    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Stock is below the requested quantity.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product is exhausted or eliminated and cannot be sold.
    #[error("Product {product_id} is not available ({status})")]
    NotAvailable {
        product_id: ProductId,
        status: ProductStatus,
    },

    /// The increase would take stock past the largest representable count.
    #[error("Stock overflow for {product_id}: {stock} + {added}")]
    StockOverflow {
        product_id: ProductId,
        stock: u32,
        added: u32,
    },

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: ProductStatus,
        action: ProductAction,
    },
}

impl ProductError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProductError::AlreadyRegistered => ErrorKind::AlreadyExists,
            ProductError::NameRequired
            | ProductError::InvalidPrice { .. }
            | ProductError::InvalidQuantity { .. }
            | ProductError::StockOverflow { .. } => ErrorKind::InvalidArgument,
            ProductError::InsufficientStock { .. } | ProductError::NotAvailable { .. } => {
                ErrorKind::NotAvailable
            }
            ProductError::InvalidStateTransition { .. } => ErrorKind::InvalidState,
        }
    }
}
