//! Purchase domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, SupplierId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{ItemQuantityUpdatedData, ItemRemovedData, LineChange, LineItem, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PurchaseEvent {
    PurchaseCreated(PurchaseCreatedData),
    ItemAdded(LineItem),
    ItemQuantityUpdated(ItemQuantityUpdatedData),
    ItemRemoved(ItemRemovedData),
    PurchaseConfirmed(PurchaseConfirmedData),

    /// The delivery was refused or postponed.
    PurchaseRescheduled(PurchaseRescheduledData),

    PurchaseReceived(PurchaseReceivedData),
    PurchaseClosed(PurchaseClosedData),
}

impl DomainEvent for PurchaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseCreated(_) => "PurchaseCreated",
            PurchaseEvent::ItemAdded(_) => "PurchaseItemAdded",
            PurchaseEvent::ItemQuantityUpdated(_) => "PurchaseItemQuantityUpdated",
            PurchaseEvent::ItemRemoved(_) => "PurchaseItemRemoved",
            PurchaseEvent::PurchaseConfirmed(_) => "PurchaseConfirmed",
            PurchaseEvent::PurchaseRescheduled(_) => "PurchaseRescheduled",
            PurchaseEvent::PurchaseReceived(_) => "PurchaseReceived",
            PurchaseEvent::PurchaseClosed(_) => "PurchaseClosed",
        }
    }
}

impl From<LineChange> for PurchaseEvent {
    fn from(change: LineChange) -> Self {
        match change {
            LineChange::Added(line) => PurchaseEvent::ItemAdded(line),
            LineChange::QuantityUpdated(data) => PurchaseEvent::ItemQuantityUpdated(data),
            LineChange::Removed(data) => PurchaseEvent::ItemRemoved(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCreatedData {
    pub purchase_id: AggregateId,
    pub supplier_id: SupplierId,

    /// The supplier's invoice or delivery note reference.
    pub document_number: String,

    /// Lines priced at unit cost.
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseConfirmedData {
    pub total: Money,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRescheduledData {
    pub reason: String,
    pub rescheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceivedData {
    /// Units received across all lines.
    pub total_quantity: u64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseClosedData {
    pub closed_at: DateTime<Utc>,
}

// Convenience constructors
impl PurchaseEvent {
    pub fn purchase_created(
        purchase_id: AggregateId,
        supplier_id: SupplierId,
        document_number: impl Into<String>,
        items: Vec<LineItem>,
    ) -> Self {
        PurchaseEvent::PurchaseCreated(PurchaseCreatedData {
            purchase_id,
            supplier_id,
            document_number: document_number.into(),
            items,
            created_at: Utc::now(),
        })
    }

    pub fn purchase_confirmed(total: Money) -> Self {
        PurchaseEvent::PurchaseConfirmed(PurchaseConfirmedData {
            total,
            confirmed_at: Utc::now(),
        })
    }

    pub fn purchase_rescheduled(reason: impl Into<String>) -> Self {
        PurchaseEvent::PurchaseRescheduled(PurchaseRescheduledData {
            reason: reason.into(),
            rescheduled_at: Utc::now(),
        })
    }

    pub fn purchase_received(total_quantity: u64) -> Self {
        PurchaseEvent::PurchaseReceived(PurchaseReceivedData {
            total_quantity,
            received_at: Utc::now(),
        })
    }

    pub fn purchase_closed() -> Self {
        PurchaseEvent::PurchaseClosed(PurchaseClosedData {
            closed_at: Utc::now(),
        })
    }
}
