//! Domain layer for the retail core.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - StateMachine trait shared by every aggregate lifecycle
//! - UnitOfWork for committing several aggregates atomically
//! - Product, Cart, Order, Payment and Purchase aggregates

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod error;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod state_machine;
pub mod unit_of_work;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{Cart, CartError, CartEvent, CartState};
pub use command::{CommandHandler, CommandResult};
pub use error::{DomainError, ErrorKind};
pub use order::{Order, OrderError, OrderEvent, OrderState};
pub use payment::{
    Confirmation, ExpiryReason, Payment, PaymentError, PaymentEvent, PaymentMethod, PaymentPolicy,
    PaymentState,
};
pub use product::{Product, ProductError, ProductEvent, ProductStatus};
pub use purchase::{Purchase, PurchaseError, PurchaseEvent, PurchaseState, ReceivedLine};
pub use state_machine::StateMachine;
pub use unit_of_work::UnitOfWork;
pub use value_objects::{LineChange, LineError, LineItem, LineItems, Money, ProductId};
