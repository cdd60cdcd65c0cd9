//! Payment lifecycle.

use common::AggregateId;
use domain::{
    CommandHandler, Confirmation, DomainError, ExpiryReason, Order, OrderState, Payment,
    PaymentError, PaymentMethod, UnitOfWork,
};
use event_store::{EventStore, EventStoreError, UniqueKey};

use crate::compensation::CompensationRunner;
use crate::env::{Environment, commit_one, keys};
use crate::error::{LifecycleError, Result};

/// One payment per confirmed order, confirmed within a time window.
pub struct PaymentService<S: EventStore> {
    payments: CommandHandler<S, Payment>,
    orders: CommandHandler<S, Order>,
    compensation: CompensationRunner<S>,
    env: Environment,
}

impl<S: EventStore + Clone> Clone for PaymentService<S> {
    fn clone(&self) -> Self {
        Self {
            payments: self.payments.clone(),
            orders: self.orders.clone(),
            compensation: self.compensation.clone(),
            env: self.env.clone(),
        }
    }
}

impl<S: EventStore + Clone> PaymentService<S> {
    pub fn new(store: S, env: Environment) -> Self {
        let compensation =
            CompensationRunner::new(store.clone(), env.clock.clone(), env.payment_policy());
        Self {
            payments: CommandHandler::new(store.clone()),
            orders: CommandHandler::new(store),
            compensation,
            env,
        }
    }
}

impl<S: EventStore> PaymentService<S> {
    pub async fn get(&self, payment_id: AggregateId) -> Result<Payment> {
        Ok(self.payments.get(payment_id).await?)
    }

    /// Returns the payment of `order_id`, if any.
    pub async fn find_by_order(&self, order_id: AggregateId) -> Result<Option<Payment>> {
        let key = UniqueKey::new(keys::PAYMENT_ORDER, order_id);
        match self.payments.store().find_unique(&key).await? {
            Some(payment_id) => Ok(self.payments.load_existing(payment_id).await?),
            None => Ok(None),
        }
    }

    /// Opens a pending payment for the total of a confirmed order.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, order_id: AggregateId, method: PaymentMethod) -> Result<Payment> {
        let order = self.orders.get(order_id).await?;
        if order.state() != OrderState::Confirmed {
            return Err(LifecycleError::OrderNotConfirmed {
                order_id,
                state: order.state(),
            });
        }

        let key = UniqueKey::new(keys::PAYMENT_ORDER, order_id);
        if let Some(existing) = self.payments.store().find_unique(&key).await? {
            return Err(LifecycleError::PaymentAlreadyExists {
                order_id,
                existing: Some(existing),
            });
        }

        let payment_id = AggregateId::new();
        let mut payment = Payment::default();
        let events = payment.create(
            payment_id,
            order_id,
            order.total(),
            method,
            self.env.clock.now(),
        )?;

        let mut uow = UnitOfWork::begin("payment.create");
        uow.stage(payment_id, &mut payment, events)?;
        uow.claim_unique(key, payment_id);
        uow.commit(self.payments.store())
            .await
            .map_err(|err| match err {
                DomainError::EventStore(EventStoreError::UniqueViolation { existing, .. }) => {
                    LifecycleError::PaymentAlreadyExists { order_id, existing }
                }
                other => other.into(),
            })?;

        tracing::info!(%payment_id, %order_id, amount = %payment.amount(), "payment created");
        Ok(payment)
    }

    /// Confirms a pending payment against its order's current total.
    ///
    /// Past the window the payment is expired and returned. On an amount
    /// mismatch the failure is recorded in its own commit and the mismatch is
    /// returned as an error. Otherwise the payment completes and the order is
    /// paid in one commit.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, payment_id: AggregateId) -> Result<Payment> {
        let mut payment = self.get(payment_id).await?;
        let order_id = payment
            .order_id()
            .ok_or_else(|| DomainError::not_found::<Payment>(payment_id))?;
        let mut order = self.orders.get(order_id).await?;
        let now = self.env.clock.now();

        match payment.evaluate(now, order.total(), &self.env.payment_policy())? {
            Confirmation::Expired => {
                let events = payment.expire(ExpiryReason::WindowElapsed, now)?;
                commit_one(
                    self.payments.store(),
                    "payment.expire",
                    payment_id,
                    &mut payment,
                    events,
                )
                .await?;

                metrics::counter!("payments_expired_total").increment(1);
                tracing::warn!(%payment_id, "payment window elapsed");
                Ok(payment)
            }
            Confirmation::AmountMismatch { expected, actual } => {
                if let Err(err) = self
                    .compensation
                    .record_payment_failure(payment_id, payment, expected, actual)
                    .await
                {
                    tracing::error!(%payment_id, error = %err, "failed to record payment failure");
                }
                Err(PaymentError::AmountMismatch { expected, actual }.into())
            }
            Confirmation::Approved => {
                let events = payment.complete(now)?;
                let order_events = order.pay(payment_id, payment.amount())?;

                let mut uow = UnitOfWork::begin("payment.confirm");
                uow.stage(payment_id, &mut payment, events)?;
                uow.stage(order_id, &mut order, order_events)?;
                uow.commit(self.payments.store()).await?;

                metrics::counter!("payments_completed_total").increment(1);
                tracing::info!(%payment_id, %order_id, "payment completed");

                if let Some(customer_id) = order.customer_id() {
                    self.env
                        .notify_customer(
                            customer_id,
                            "Payment received",
                            format!("Payment of {} for order {order_id} received", payment.amount()),
                        )
                        .await;
                }
                Ok(payment)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_method(
        &self,
        payment_id: AggregateId,
        method: PaymentMethod,
    ) -> Result<Payment> {
        let mut payment = self.get(payment_id).await?;
        let events = payment.change_method(method)?;
        commit_one(
            self.payments.store(),
            "payment.change_method",
            payment_id,
            &mut payment,
            events,
        )
        .await?;
        Ok(payment)
    }

    /// Puts a failed payment back to pending for another confirmation.
    #[tracing::instrument(skip(self))]
    pub async fn pay_again(&self, payment_id: AggregateId) -> Result<Payment> {
        let mut payment = self.get(payment_id).await?;
        let events = payment.retry(self.env.clock.now())?;
        commit_one(
            self.payments.store(),
            "payment.retry",
            payment_id,
            &mut payment,
            events,
        )
        .await?;
        Ok(payment)
    }
}
