//! Cart domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{ItemQuantityUpdatedData, ItemRemovedData, LineChange, LineItem, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    CartCreated(CartCreatedData),
    ItemAdded(LineItem),
    ItemQuantityUpdated(ItemQuantityUpdatedData),
    ItemRemoved(ItemRemovedData),

    /// An abandoned cart was edited and is active again.
    CartReactivated(CartReactivatedData),

    CartCheckedOut(CartCheckedOutData),
    CartAbandoned(CartAbandonedData),

    /// The order created from this cart was confirmed.
    CartConfirmed(CartConfirmedData),

    CartDeleted(CartDeletedData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartCreated(_) => "CartCreated",
            CartEvent::ItemAdded(_) => "CartItemAdded",
            CartEvent::ItemQuantityUpdated(_) => "CartItemQuantityUpdated",
            CartEvent::ItemRemoved(_) => "CartItemRemoved",
            CartEvent::CartReactivated(_) => "CartReactivated",
            CartEvent::CartCheckedOut(_) => "CartCheckedOut",
            CartEvent::CartAbandoned(_) => "CartAbandoned",
            CartEvent::CartConfirmed(_) => "CartConfirmed",
            CartEvent::CartDeleted(_) => "CartDeleted",
        }
    }
}

impl From<LineChange> for CartEvent {
    fn from(change: LineChange) -> Self {
        match change {
            LineChange::Added(line) => CartEvent::ItemAdded(line),
            LineChange::QuantityUpdated(data) => CartEvent::ItemQuantityUpdated(data),
            LineChange::Removed(data) => CartEvent::ItemRemoved(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCreatedData {
    pub cart_id: AggregateId,
    pub customer_id: CustomerId,

    /// Lines with the prices captured at creation.
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartReactivatedData {
    pub reactivated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckedOutData {
    pub total: Money,
    pub checked_out_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAbandonedData {
    pub abandoned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfirmedData {
    pub order_id: AggregateId,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDeletedData {
    pub deleted_at: DateTime<Utc>,
}

// Convenience constructors
impl CartEvent {
    pub fn cart_created(cart_id: AggregateId, customer_id: CustomerId, items: Vec<LineItem>) -> Self {
        CartEvent::CartCreated(CartCreatedData {
            cart_id,
            customer_id,
            items,
            created_at: Utc::now(),
        })
    }

    pub fn cart_reactivated() -> Self {
        CartEvent::CartReactivated(CartReactivatedData {
            reactivated_at: Utc::now(),
        })
    }

    pub fn cart_checked_out(total: Money) -> Self {
        CartEvent::CartCheckedOut(CartCheckedOutData {
            total,
            checked_out_at: Utc::now(),
        })
    }

    pub fn cart_abandoned() -> Self {
        CartEvent::CartAbandoned(CartAbandonedData {
            abandoned_at: Utc::now(),
        })
    }

    pub fn cart_confirmed(order_id: AggregateId) -> Self {
        CartEvent::CartConfirmed(CartConfirmedData {
            order_id,
            confirmed_at: Utc::now(),
        })
    }

    pub fn cart_deleted() -> Self {
        CartEvent::CartDeleted(CartDeletedData {
            deleted_at: Utc::now(),
        })
    }
}
