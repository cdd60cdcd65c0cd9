//! Failure markers that must survive the caller's rollback.
//!
//! Each operation here commits in its own unit of work, separate from the
//! operation that detected the failure. The caller still fails afterwards, and
//! whatever it had staged is dropped, but the marker stays committed.

use std::sync::Arc;

use common::AggregateId;
use domain::{Money, Payment, PaymentPolicy, PaymentState, Purchase};
use event_store::EventStore;

use crate::env::commit_one;
use crate::error::Result;
use crate::services::Clock;

pub struct CompensationRunner<S: EventStore> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: PaymentPolicy,
}

impl<S: EventStore + Clone> Clone for CompensationRunner<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
        }
    }
}

impl<S: EventStore> CompensationRunner<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, policy: PaymentPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Marks a payment failed after an amount mismatch.
    ///
    /// The attempt that exhausts the retry budget expires the payment in the
    /// same commit.
    #[tracing::instrument(skip(self, payment))]
    pub async fn record_payment_failure(
        &self,
        payment_id: AggregateId,
        mut payment: Payment,
        expected: Money,
        actual: Money,
    ) -> Result<Payment> {
        let events = payment.record_failure(expected, actual, &self.policy, self.clock.now())?;
        commit_one(
            &self.store,
            "compensation.payment_failure",
            payment_id,
            &mut payment,
            events,
        )
        .await?;

        metrics::counter!("compensations_total", "kind" => "payment_failure").increment(1);
        metrics::counter!("payments_failed_total").increment(1);
        if payment.state() == PaymentState::Expired {
            metrics::counter!("payments_expired_total").increment(1);
        }
        tracing::warn!(
            %payment_id,
            %expected,
            %actual,
            attempts = payment.failed_attempts(),
            state = %payment.state(),
            "payment failure recorded"
        );
        Ok(payment)
    }

    /// Marks a purchase rescheduled after a receipt mismatch.
    #[tracing::instrument(skip(self, purchase, reason))]
    pub async fn record_purchase_reschedule(
        &self,
        purchase_id: AggregateId,
        mut purchase: Purchase,
        reason: impl Into<String>,
    ) -> Result<Purchase> {
        let reason = reason.into();
        let events = purchase.reschedule(reason.clone())?;
        commit_one(
            &self.store,
            "compensation.purchase_reschedule",
            purchase_id,
            &mut purchase,
            events,
        )
        .await?;

        metrics::counter!("compensations_total", "kind" => "purchase_reschedule").increment(1);
        metrics::counter!("purchases_rescheduled_total").increment(1);
        tracing::warn!(%purchase_id, %reason, "purchase rescheduled");
        Ok(purchase)
    }
}
