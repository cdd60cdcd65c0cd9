//! Collaborators shared by the lifecycle services.

use std::sync::Arc;

use common::{AggregateId, CustomerId, SupplierId};
use domain::{Aggregate, PaymentPolicy, UnitOfWork};
use event_store::{CommitReceipt, EventStore};

use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, Result};
use crate::services::{
    Clock, Directory, InMemoryDirectory, LogNotifier, Notification, Notifier, Party, SystemClock,
};

/// Natural keys claimed alongside the events that create an aggregate.
pub mod keys {
    /// One order per cart.
    pub const ORDER_CART: &str = "order.cart";
    /// One payment per order.
    pub const PAYMENT_ORDER: &str = "payment.order";
    /// Supplier document numbers are unique across purchases.
    pub const PURCHASE_DOCUMENT: &str = "purchase.document";
}

#[derive(Clone)]
pub struct Environment {
    pub directory: Arc<dyn Directory>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub config: LifecycleConfig,
}

impl Environment {
    pub fn new(
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            directory,
            notifier,
            clock,
            config,
        }
    }

    /// An in-memory directory with a logging notifier and the system clock.
    pub fn in_memory(directory: InMemoryDirectory, config: LifecycleConfig) -> Self {
        Self::new(
            Arc::new(directory),
            Arc::new(LogNotifier),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn payment_policy(&self) -> PaymentPolicy {
        self.config.payment_policy()
    }

    /// Resolves a customer that may place carts and orders.
    pub(crate) async fn active_customer(&self, id: CustomerId) -> Result<Party> {
        let party = self
            .directory
            .customer(id)
            .await?
            .ok_or(LifecycleError::CustomerNotFound(id))?;
        if !party.is_active() {
            return Err(LifecycleError::CustomerInactive(id));
        }
        Ok(party)
    }

    /// Resolves a supplier that may receive purchases.
    pub(crate) async fn active_supplier(&self, id: SupplierId) -> Result<Party> {
        let party = self
            .directory
            .supplier(id)
            .await?
            .ok_or(LifecycleError::SupplierNotFound(id))?;
        if !party.is_active() {
            return Err(LifecycleError::SupplierInactive(id));
        }
        Ok(party)
    }

    /// Notifies a customer after a commit. Lookup failures are logged only.
    pub(crate) async fn notify_customer(&self, id: CustomerId, subject: &str, body: String) {
        match self.directory.customer(id).await {
            Ok(Some(party)) => {
                self.notifier
                    .notify(Notification::new(party.email, subject, body))
                    .await
            }
            Ok(None) => tracing::warn!(customer_id = %id, "no contact for notification"),
            Err(err) => tracing::warn!(customer_id = %id, error = %err, "notification skipped"),
        }
    }

    pub(crate) async fn notify_supplier(&self, id: SupplierId, subject: &str, body: String) {
        match self.directory.supplier(id).await {
            Ok(Some(party)) => {
                self.notifier
                    .notify(Notification::new(party.email, subject, body))
                    .await
            }
            Ok(None) => tracing::warn!(supplier_id = %id, "no contact for notification"),
            Err(err) => tracing::warn!(supplier_id = %id, error = %err, "notification skipped"),
        }
    }
}

/// Stages one aggregate's events in a fresh unit of work and commits it.
pub(crate) async fn commit_one<S, A>(
    store: &S,
    name: &'static str,
    aggregate_id: AggregateId,
    aggregate: &mut A,
    events: Vec<A::Event>,
) -> Result<Option<CommitReceipt>>
where
    S: EventStore,
    A: Aggregate,
{
    if events.is_empty() {
        return Ok(None);
    }

    let mut uow = UnitOfWork::begin(name);
    uow.stage(aggregate_id, aggregate, events)?;
    Ok(Some(uow.commit(store).await?))
}
