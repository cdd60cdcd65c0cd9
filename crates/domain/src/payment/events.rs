//! Payment domain events.
//!
//! Timestamps come from the caller's clock rather than `Utc::now()`, so the
//! payment window can be evaluated against the same time source.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::Money;

use super::{ExpiryReason, PaymentMethod};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreatedData),
    PaymentMethodChanged(PaymentMethodChangedData),
    PaymentCompleted(PaymentCompletedData),

    /// A confirmation found the amount did not match the order.
    PaymentFailed(PaymentFailedData),

    /// A failed payment went back to pending.
    PaymentRetried(PaymentRetriedData),

    PaymentExpired(PaymentExpiredData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "PaymentCreated",
            PaymentEvent::PaymentMethodChanged(_) => "PaymentMethodChanged",
            PaymentEvent::PaymentCompleted(_) => "PaymentCompleted",
            PaymentEvent::PaymentFailed(_) => "PaymentFailed",
            PaymentEvent::PaymentRetried(_) => "PaymentRetried",
            PaymentEvent::PaymentExpired(_) => "PaymentExpired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreatedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,

    /// The order total when the payment was created.
    pub amount: Money,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodChangedData {
    pub old_method: PaymentMethod,
    pub new_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompletedData {
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    /// The order total at confirmation time.
    pub expected: Money,

    /// The payment's amount.
    pub actual: Money,

    /// Failed attempts including this one.
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRetriedData {
    pub retried_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentExpiredData {
    pub reason: ExpiryReason,
    pub expired_at: DateTime<Utc>,
}
