//! Lifecycles of the retail core.
//!
//! Each lifecycle operation loads the aggregates it touches, asks them for
//! events, stages those events in one unit of work and commits once:
//! 1. Cart: items priced at add time, checked out into an order
//! 2. Order: one per cart; confirmation takes stock and confirms the cart
//! 3. Payment: one per confirmed order; window, amount check, bounded retries
//! 4. Purchase: supplier restock; receipt must match and increases stock
//!
//! Failures that must be remembered even though the operation fails (payment
//! amount mismatch, purchase receipt mismatch) are committed separately by the
//! compensation runner.

pub mod cart;
pub mod compensation;
pub mod config;
pub mod env;
pub mod error;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod purchase;
pub mod services;

pub use cart::CartService;
pub use compensation::CompensationRunner;
pub use config::LifecycleConfig;
pub use env::{Environment, keys};
pub use error::{LifecycleError, Result};
pub use inventory::InventoryGuard;
pub use order::OrderService;
pub use payment::PaymentService;
pub use purchase::{PurchaseLine, PurchaseService};
pub use services::{
    Clock, Directory, InMemoryDirectory, InMemoryNotifier, LogNotifier, ManualClock, Notification,
    Notifier, Party, PartyStatus, SystemClock,
};

use event_store::EventStore;

/// Every lifecycle over one event store.
pub struct RetailCore<S: EventStore> {
    pub inventory: InventoryGuard<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub payments: PaymentService<S>,
    pub purchases: PurchaseService<S>,
}

impl<S: EventStore + Clone> RetailCore<S> {
    pub fn new(store: S, env: Environment) -> Self {
        Self {
            inventory: InventoryGuard::new(store.clone()),
            carts: CartService::new(store.clone(), env.clone()),
            orders: OrderService::new(store.clone(), env.clone()),
            payments: PaymentService::new(store.clone(), env.clone()),
            purchases: PurchaseService::new(store, env),
        }
    }
}

impl<S: EventStore + Clone> Clone for RetailCore<S> {
    fn clone(&self) -> Self {
        Self {
            inventory: self.inventory.clone(),
            carts: self.carts.clone(),
            orders: self.orders.clone(),
            payments: self.payments.clone(),
            purchases: self.purchases.clone(),
        }
    }
}
