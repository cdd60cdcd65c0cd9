//! Purchase lifecycle.

use common::{AggregateId, SupplierId};
use domain::{
    CommandHandler, DomainError, LineItem, Money, ProductId, Purchase, PurchaseError,
    ReceivedLine, UnitOfWork,
};
use event_store::{EventStore, EventStoreError, UniqueKey};

use crate::compensation::CompensationRunner;
use crate::env::{Environment, commit_one, keys};
use crate::error::{LifecycleError, Result};
use crate::inventory::InventoryGuard;

/// A line of a purchase as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_cost: Money,
}

impl PurchaseLine {
    pub fn new(product_id: ProductId, quantity: u32, unit_cost: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_cost,
        }
    }
}

/// Supplier restock workflow; stock changes only when a delivery is received.
pub struct PurchaseService<S: EventStore> {
    purchases: CommandHandler<S, Purchase>,
    inventory: InventoryGuard<S>,
    compensation: CompensationRunner<S>,
    env: Environment,
}

impl<S: EventStore + Clone> Clone for PurchaseService<S> {
    fn clone(&self) -> Self {
        Self {
            purchases: self.purchases.clone(),
            inventory: self.inventory.clone(),
            compensation: self.compensation.clone(),
            env: self.env.clone(),
        }
    }
}

impl<S: EventStore + Clone> PurchaseService<S> {
    pub fn new(store: S, env: Environment) -> Self {
        let compensation =
            CompensationRunner::new(store.clone(), env.clock.clone(), env.payment_policy());
        Self {
            purchases: CommandHandler::new(store.clone()),
            inventory: InventoryGuard::new(store),
            compensation,
            env,
        }
    }
}

impl<S: EventStore> PurchaseService<S> {
    pub async fn get(&self, purchase_id: AggregateId) -> Result<Purchase> {
        Ok(self.purchases.get(purchase_id).await?)
    }

    /// Creates a purchase from an active supplier under a unique document number.
    #[tracing::instrument(skip(self, document_number, items))]
    pub async fn create(
        &self,
        supplier_id: SupplierId,
        document_number: impl Into<String>,
        items: &[PurchaseLine],
    ) -> Result<Purchase> {
        let document_number = document_number.into();
        self.env.active_supplier(supplier_id).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            lines.push(self.line(item).await?);
        }

        let purchase_id = AggregateId::new();
        let mut purchase = Purchase::default();
        let events = purchase.create(purchase_id, supplier_id, document_number.clone(), lines)?;

        let key = UniqueKey::new(keys::PURCHASE_DOCUMENT, document_number.trim());
        if self.purchases.store().find_unique(&key).await?.is_some() {
            return Err(LifecycleError::DuplicateDocument { document_number });
        }

        let mut uow = UnitOfWork::begin("purchase.create");
        uow.stage(purchase_id, &mut purchase, events)?;
        uow.claim_unique(key, purchase_id);
        uow.commit(self.purchases.store())
            .await
            .map_err(|err| match err {
                DomainError::EventStore(EventStoreError::UniqueViolation { .. }) => {
                    LifecycleError::DuplicateDocument {
                        document_number: document_number.clone(),
                    }
                }
                other => other.into(),
            })?;

        tracing::info!(%purchase_id, %supplier_id, %document_number, "purchase created");
        Ok(purchase)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, purchase_id: AggregateId, item: PurchaseLine) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let line = self.line(&item).await?;
        let events = purchase.add_item(line)?;
        commit_one(
            self.purchases.store(),
            "purchase.add_item",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;
        Ok(purchase)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        purchase_id: AggregateId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let events = purchase.update_item(product_id, quantity)?;
        commit_one(
            self.purchases.store(),
            "purchase.update_item",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;
        Ok(purchase)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        purchase_id: AggregateId,
        product_id: ProductId,
    ) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let events = purchase.remove_item(product_id)?;
        commit_one(
            self.purchases.store(),
            "purchase.remove_item",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;
        Ok(purchase)
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, purchase_id: AggregateId) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let events = purchase.confirm()?;
        commit_one(
            self.purchases.store(),
            "purchase.confirm",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;

        tracing::info!(%purchase_id, total = %purchase.total(), "purchase confirmed");
        if let Some(supplier_id) = purchase.supplier_id() {
            self.env
                .notify_supplier(
                    supplier_id,
                    "Purchase confirmed",
                    format!(
                        "Purchase {} ({} lines, {}) was confirmed",
                        purchase.document_number(),
                        purchase.items().len(),
                        purchase.total()
                    ),
                )
                .await;
        }
        Ok(purchase)
    }

    /// Receives a delivery that must match the confirmed lines exactly.
    ///
    /// A mismatch reschedules the purchase in its own commit and is then
    /// returned as an error. A match increases stock for every line and marks
    /// the purchase received in one commit.
    #[tracing::instrument(skip(self, received))]
    pub async fn receive(
        &self,
        purchase_id: AggregateId,
        received: &[ReceivedLine],
    ) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;

        if let Err(err) = purchase.verify_receipt(received) {
            if let PurchaseError::ReceiptMismatch { reason } = &err {
                if let Err(comp) = self
                    .compensation
                    .record_purchase_reschedule(purchase_id, purchase, reason.clone())
                    .await
                {
                    tracing::error!(%purchase_id, error = %comp, "failed to record purchase reschedule");
                }
            }
            return Err(err.into());
        }

        let events = purchase.receive()?;
        let mut uow = UnitOfWork::begin("purchase.receive");
        for line in purchase.items().iter() {
            self.inventory
                .stage_increase(&mut uow, line.product_id, line.quantity, false)
                .await?;
        }
        uow.stage(purchase_id, &mut purchase, events)?;
        uow.commit(self.purchases.store()).await?;

        metrics::counter!("purchases_received_total").increment(1);
        tracing::info!(
            %purchase_id,
            units = purchase.items().total_quantity(),
            "purchase received"
        );
        Ok(purchase)
    }

    #[tracing::instrument(skip(self, reason))]
    pub async fn reschedule(
        &self,
        purchase_id: AggregateId,
        reason: impl Into<String>,
    ) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let events = purchase.reschedule(reason)?;
        commit_one(
            self.purchases.store(),
            "purchase.reschedule",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;

        metrics::counter!("purchases_rescheduled_total").increment(1);
        Ok(purchase)
    }

    #[tracing::instrument(skip(self))]
    pub async fn close(&self, purchase_id: AggregateId) -> Result<Purchase> {
        let mut purchase = self.get(purchase_id).await?;
        let events = purchase.close()?;
        commit_one(
            self.purchases.store(),
            "purchase.close",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;

        tracing::info!(%purchase_id, "purchase closed");
        Ok(purchase)
    }

    /// Resolves a requested line against an existing product.
    async fn line(&self, item: &PurchaseLine) -> Result<LineItem> {
        let product = self.inventory.get(item.product_id).await?;
        Ok(LineItem::new(
            item.product_id,
            product.name(),
            item.quantity,
            item.unit_cost,
        ))
    }
}
