//! Purchase aggregate implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{AggregateId, SupplierId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::state_machine::StateMachine;
use crate::value_objects::{LineChange, LineItem, LineItems, Money, ProductId};

use super::{
    MAX_DOCUMENT_NUMBER_LEN, PurchaseAction, PurchaseError, PurchaseEvent, PurchaseState,
    events::PurchaseCreatedData,
};

/// A product quantity counted on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ReceivedLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A restock order placed with a supplier.
#[derive(Debug, Clone, Default)]
pub struct Purchase {
    id: Option<AggregateId>,
    version: Version,
    supplier_id: Option<SupplierId>,
    document_number: String,
    state: PurchaseState,
    items: LineItems,
    total: Money,
    reschedule_count: u32,
    created_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
}

impl Aggregate for Purchase {
    type Event = PurchaseEvent;
    type Error = PurchaseError;

    fn aggregate_type() -> &'static str {
        "Purchase"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            PurchaseEvent::PurchaseCreated(data) => self.apply_created(data),
            PurchaseEvent::ItemAdded(line) => self.apply_line_change(LineChange::Added(line)),
            PurchaseEvent::ItemQuantityUpdated(data) => {
                self.apply_line_change(LineChange::QuantityUpdated(data))
            }
            PurchaseEvent::ItemRemoved(data) => {
                self.apply_line_change(LineChange::Removed(data))
            }
            PurchaseEvent::PurchaseConfirmed(_) => self.state = PurchaseState::Confirmed,
            PurchaseEvent::PurchaseRescheduled(_) => {
                self.state = PurchaseState::Rescheduled;
                self.reschedule_count += 1;
            }
            PurchaseEvent::PurchaseReceived(data) => {
                self.state = PurchaseState::Received;
                self.received_at = Some(data.received_at);
            }
            PurchaseEvent::PurchaseClosed(_) => self.state = PurchaseState::Closed,
        }
    }
}

// Query methods
impl Purchase {
    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    pub fn state(&self) -> PurchaseState {
        self.state
    }

    pub fn items(&self) -> &LineItems {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// How many times delivery was rescheduled.
    pub fn reschedule_count(&self) -> u32 {
        self.reschedule_count
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }
}

// Command methods (return events)
impl Purchase {
    pub fn create(
        &self,
        purchase_id: AggregateId,
        supplier_id: SupplierId,
        document_number: impl Into<String>,
        items: Vec<LineItem>,
    ) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        if self.id.is_some() {
            return Err(PurchaseError::AlreadyCreated);
        }

        let document_number = document_number.into();
        let trimmed = document_number.trim();
        if trimmed.is_empty() {
            return Err(PurchaseError::DocumentNumberRequired);
        }
        let length = trimmed.chars().count();
        if length > MAX_DOCUMENT_NUMBER_LEN {
            return Err(PurchaseError::DocumentNumberTooLong {
                length,
                max: MAX_DOCUMENT_NUMBER_LEN,
            });
        }

        let items = LineItems::from_lines(items)?;
        Ok(vec![PurchaseEvent::purchase_created(
            purchase_id,
            supplier_id,
            document_number,
            items.to_vec(),
        )])
    }

    pub fn add_item(&self, line: LineItem) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::MutateItems)?;
        Ok(vec![self.items.plan_add(line)?.into()])
    }

    pub fn update_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::MutateItems)?;
        Ok(self
            .items
            .plan_update(product_id, quantity)?
            .map(PurchaseEvent::from)
            .into_iter()
            .collect())
    }

    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::MutateItems)?;
        Ok(vec![self.items.plan_remove(product_id)?.into()])
    }

    pub fn confirm(&self) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::Confirm)?;
        if self.items.is_empty() {
            return Err(PurchaseError::NoItems);
        }
        Ok(vec![PurchaseEvent::purchase_confirmed(self.total)])
    }

    /// Checks a delivery against the confirmed lines.
    ///
    /// Every product must arrive exactly once with exactly the confirmed
    /// quantity; partial deliveries are refused.
    pub fn verify_receipt(&self, received: &[ReceivedLine]) -> Result<(), PurchaseError> {
        self.guard(PurchaseAction::Receive)?;

        let mismatch = |reason: String| Err(PurchaseError::ReceiptMismatch { reason });

        if received.len() != self.items.len() {
            return mismatch(format!(
                "expected {} lines, received {}",
                self.items.len(),
                received.len()
            ));
        }

        let mut counted: HashMap<ProductId, u32> = HashMap::with_capacity(received.len());
        for line in received {
            if counted.insert(line.product_id, line.quantity).is_some() {
                return mismatch(format!("product {} received twice", line.product_id));
            }
        }

        for item in self.items.iter() {
            match counted.get(&item.product_id) {
                None => return mismatch(format!("product {} missing", item.product_id)),
                Some(&quantity) if quantity != item.quantity => {
                    return mismatch(format!(
                        "product {} expected {}, received {}",
                        item.product_id, item.quantity, quantity
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Accepts a delivery already checked by [`verify_receipt`](Self::verify_receipt).
    pub fn receive(&self) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::Receive)?;
        Ok(vec![PurchaseEvent::purchase_received(
            self.items.total_quantity(),
        )])
    }

    pub fn reschedule(&self, reason: impl Into<String>) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::Reschedule)?;
        Ok(vec![PurchaseEvent::purchase_rescheduled(reason)])
    }

    pub fn close(&self) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.guard(PurchaseAction::Close)?;
        Ok(vec![PurchaseEvent::purchase_closed()])
    }

    fn guard(&self, action: PurchaseAction) -> Result<PurchaseState, PurchaseError> {
        self.state
            .next(action)
            .ok_or(PurchaseError::InvalidStateTransition {
                current_state: self.state,
                action,
            })
    }
}

// Apply event helpers
impl Purchase {
    fn apply_created(&mut self, data: PurchaseCreatedData) {
        self.id = Some(data.purchase_id);
        self.supplier_id = Some(data.supplier_id);
        self.document_number = data.document_number;
        self.items = LineItems::from(data.items);
        self.total = self.items.total();
        self.state = PurchaseState::Created;
        self.created_at = Some(data.created_at);
    }

    fn apply_line_change(&mut self, change: LineChange) {
        self.items.apply(change);
        self.total = self.items.total();
    }
}
