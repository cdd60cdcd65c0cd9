//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, CustomerId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{ItemQuantityUpdatedData, ItemRemovedData, LineChange, LineItem, Money};

use super::OrderState;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created from a checked-out cart.
    OrderCreated(OrderCreatedData),

    ItemAdded(LineItem),
    ItemQuantityUpdated(ItemQuantityUpdatedData),
    ItemRemoved(ItemRemovedData),

    /// Stock was taken and the order accepted.
    OrderConfirmed(OrderConfirmedData),

    /// A payment for the order completed.
    OrderPaid(OrderPaidData),

    OrderShipped(OrderShippedData),
    OrderDelivered(OrderDeliveredData),
    OrderCanceled(OrderCanceledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::ItemAdded(_) => "OrderItemAdded",
            OrderEvent::ItemQuantityUpdated(_) => "OrderItemQuantityUpdated",
            OrderEvent::ItemRemoved(_) => "OrderItemRemoved",
            OrderEvent::OrderConfirmed(_) => "OrderConfirmed",
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::OrderShipped(_) => "OrderShipped",
            OrderEvent::OrderDelivered(_) => "OrderDelivered",
            OrderEvent::OrderCanceled(_) => "OrderCanceled",
        }
    }
}

impl From<LineChange> for OrderEvent {
    fn from(change: LineChange) -> Self {
        match change {
            LineChange::Added(line) => OrderEvent::ItemAdded(line),
            LineChange::QuantityUpdated(data) => OrderEvent::ItemQuantityUpdated(data),
            LineChange::Removed(data) => OrderEvent::ItemRemoved(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: AggregateId,

    /// The cart the lines were copied from.
    pub cart_id: AggregateId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub total: Money,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub payment_id: AggregateId,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderShippedData {
    pub shipped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeliveredData {
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCanceledData {
    pub reason: String,

    /// The state the order was canceled from.
    pub previous_state: OrderState,
    pub canceled_at: DateTime<Utc>,
}

// Convenience constructors
impl OrderEvent {
    pub fn order_created(
        order_id: AggregateId,
        cart_id: AggregateId,
        customer_id: CustomerId,
        items: Vec<LineItem>,
    ) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            cart_id,
            customer_id,
            items,
            created_at: Utc::now(),
        })
    }

    pub fn order_confirmed(total: Money) -> Self {
        OrderEvent::OrderConfirmed(OrderConfirmedData {
            total,
            confirmed_at: Utc::now(),
        })
    }

    pub fn order_paid(payment_id: AggregateId, amount: Money) -> Self {
        OrderEvent::OrderPaid(OrderPaidData {
            payment_id,
            amount,
            paid_at: Utc::now(),
        })
    }

    pub fn order_shipped() -> Self {
        OrderEvent::OrderShipped(OrderShippedData {
            shipped_at: Utc::now(),
        })
    }

    pub fn order_delivered() -> Self {
        OrderEvent::OrderDelivered(OrderDeliveredData {
            delivered_at: Utc::now(),
        })
    }

    pub fn order_canceled(reason: impl Into<String>, previous_state: OrderState) -> Self {
        OrderEvent::OrderCanceled(OrderCanceledData {
            reason: reason.into(),
            previous_state,
            canceled_at: Utc::now(),
        })
    }
}
