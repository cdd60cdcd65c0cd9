//! Payment aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::state_machine::StateMachine;
use crate::value_objects::Money;

use super::{
    ExpiryReason, PaymentAction, PaymentError, PaymentEvent, PaymentMethod, PaymentState,
    events::{
        PaymentCompletedData, PaymentCreatedData, PaymentExpiredData, PaymentFailedData,
        PaymentMethodChangedData, PaymentRetriedData,
    },
};

/// Limits applied when a payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPolicy {
    /// Time after creation within which the payment must be confirmed.
    pub expiry_window: Duration,

    /// Failed attempts after which the payment expires.
    pub max_attempts: u32,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            expiry_window: Duration::minutes(5),
            max_attempts: 3,
        }
    }
}

/// Outcome of checking a pending payment at confirmation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The window has elapsed; amount is not considered.
    Expired,

    /// Within the window but the order total changed.
    AmountMismatch { expected: Money, actual: Money },

    Approved,
}

/// One payment per order, holding the order total captured at creation.
#[derive(Debug, Clone, Default)]
pub struct Payment {
    id: Option<AggregateId>,
    version: Version,
    order_id: Option<AggregateId>,
    amount: Money,
    method: Option<PaymentMethod>,
    state: PaymentState,
    failed_attempts: u32,
    created_at: Option<DateTime<Utc>>,
    /// Set only by completion.
    processed_at: Option<DateTime<Utc>>,
    last_failed_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
    expiry_reason: Option<ExpiryReason>,
}

impl Aggregate for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn aggregate_type() -> &'static str {
        "Payment"
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
            PaymentEvent::PaymentCreated(data) => self.apply_created(data),
            PaymentEvent::PaymentMethodChanged(data) => self.method = Some(data.new_method),
            PaymentEvent::PaymentCompleted(data) => {
                self.state = PaymentState::Completed;
                self.processed_at = Some(data.processed_at);
            }
            PaymentEvent::PaymentFailed(data) => {
                self.state = PaymentState::Failed;
                self.failed_attempts = data.attempts;
                self.last_failed_at = Some(data.failed_at);
            }
            PaymentEvent::PaymentRetried(_) => self.state = PaymentState::Pending,
            PaymentEvent::PaymentExpired(data) => {
                self.state = PaymentState::Expired;
                self.expiry_reason = Some(data.reason);
                self.expired_at = Some(data.expired_at);
            }
        }
    }
}

// Query methods
impl Payment {
    pub fn order_id(&self) -> Option<AggregateId> {
        self.order_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn last_failed_at(&self) -> Option<DateTime<Utc>> {
        self.last_failed_at
    }

    pub fn expired_at(&self) -> Option<DateTime<Utc>> {
        self.expired_at
    }

    pub fn expiry_reason(&self) -> Option<ExpiryReason> {
        self.expiry_reason
    }

    /// Returns true once the window measured from creation has closed.
    pub fn is_past_window(&self, now: DateTime<Utc>, policy: &PaymentPolicy) -> bool {
        self.created_at
            .is_some_and(|created| now > created + policy.expiry_window)
    }
}

// Command methods (return events)
impl Payment {
    pub fn create(
        &self,
        payment_id: AggregateId,
        order_id: AggregateId,
        amount: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if self.id.is_some() {
            return Err(PaymentError::AlreadyCreated);
        }
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount { amount });
        }

        Ok(vec![PaymentEvent::PaymentCreated(PaymentCreatedData {
            payment_id,
            order_id,
            amount,
            method,
            created_at: now,
        })])
    }

    pub fn change_method(&self, method: PaymentMethod) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.guard(PaymentAction::ChangeMethod)?;

        match self.method {
            Some(current) if current == method => Ok(vec![]),
            current => Ok(vec![PaymentEvent::PaymentMethodChanged(
                PaymentMethodChangedData {
                    old_method: current.unwrap_or(method),
                    new_method: method,
                },
            )]),
        }
    }

    /// Decides the outcome of confirming this payment against `order_total`.
    ///
    /// The window is checked before the amount. Only a pending payment can be
    /// confirmed.
    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        order_total: Money,
        policy: &PaymentPolicy,
    ) -> Result<Confirmation, PaymentError> {
        self.guard(PaymentAction::Complete)?;

        Ok(if self.is_past_window(now, policy) {
            Confirmation::Expired
        } else if self.amount != order_total {
            Confirmation::AmountMismatch {
                expected: order_total,
                actual: self.amount,
            }
        } else {
            Confirmation::Approved
        })
    }

    pub fn complete(&self, now: DateTime<Utc>) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.guard(PaymentAction::Complete)?;
        Ok(vec![PaymentEvent::PaymentCompleted(PaymentCompletedData {
            processed_at: now,
        })])
    }

    /// Records a failed confirmation.
    ///
    /// The attempt counter is capped at `policy.max_attempts`; the attempt that
    /// reaches the cap also expires the payment.
    pub fn record_failure(
        &self,
        expected: Money,
        actual: Money,
        policy: &PaymentPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.guard(PaymentAction::Fail)?;

        let attempts = (self.failed_attempts + 1).min(policy.max_attempts);
        let mut events = vec![PaymentEvent::PaymentFailed(PaymentFailedData {
            expected,
            actual,
            attempts,
            failed_at: now,
        })];

        if attempts >= policy.max_attempts {
            events.push(PaymentEvent::PaymentExpired(PaymentExpiredData {
                reason: ExpiryReason::AttemptsExhausted,
                expired_at: now,
            }));
        }

        Ok(events)
    }

    pub fn expire(
        &self,
        reason: ExpiryReason,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.guard(PaymentAction::Expire)?;
        Ok(vec![PaymentEvent::PaymentExpired(PaymentExpiredData {
            reason,
            expired_at: now,
        })])
    }

    /// Puts a failed payment back to pending.
    pub fn retry(&self, now: DateTime<Utc>) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.guard(PaymentAction::Retry)?;
        Ok(vec![PaymentEvent::PaymentRetried(PaymentRetriedData {
            retried_at: now,
        })])
    }

    fn guard(&self, action: PaymentAction) -> Result<PaymentState, PaymentError> {
        self.state
            .next(action)
            .ok_or(PaymentError::InvalidStateTransition {
                current_state: self.state,
                action,
            })
    }
}

// Apply event helpers
impl Payment {
    fn apply_created(&mut self, data: PaymentCreatedData) {
        self.id = Some(data.payment_id);
        self.order_id = Some(data.order_id);
        self.amount = data.amount;
        self.method = Some(data.method);
        self.state = PaymentState::Pending;
        self.created_at = Some(data.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pending(cents: i64) -> Payment {
        let mut payment = Payment::default();
        let events = payment
            .create(
                AggregateId::new(),
                AggregateId::new(),
                Money::from_cents(cents),
                PaymentMethod::CreditCard,
                t0(),
            )
            .unwrap();
        payment.apply_events(events);
        payment
    }

    #[test]
    fn test_create_requires_positive_amount() {
        let err = Payment::default()
            .create(
                AggregateId::new(),
                AggregateId::new(),
                Money::zero(),
                PaymentMethod::Cash,
                t0(),
            )
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_window_is_checked_before_amount() {
        let payment = pending(2000);
        let policy = PaymentPolicy::default();
        let late = t0() + Duration::minutes(5) + Duration::seconds(1);

        assert_eq!(
            payment.evaluate(late, Money::from_cents(2000), &policy).unwrap(),
            Confirmation::Expired
        );
        assert_eq!(
            payment.evaluate(late, Money::from_cents(1), &policy).unwrap(),
            Confirmation::Expired
        );
        // Exactly at the boundary the window is still open.
        assert_eq!(
            payment
                .evaluate(t0() + Duration::minutes(5), Money::from_cents(2000), &policy)
                .unwrap(),
            Confirmation::Approved
        );
    }

    #[test]
    fn test_mismatch_reports_both_amounts() {
        let payment = pending(2000);
        assert_eq!(
            payment
                .evaluate(t0(), Money::from_cents(2500), &PaymentPolicy::default())
                .unwrap(),
            Confirmation::AmountMismatch {
                expected: Money::from_cents(2500),
                actual: Money::from_cents(2000),
            }
        );
    }

    #[test]
    fn test_failures_expire_at_cap() {
        let policy = PaymentPolicy::default();
        let mut payment = pending(2000);

        for attempt in 1..policy.max_attempts {
            let events = payment
                .record_failure(Money::from_cents(1), Money::from_cents(2000), &policy, t0())
                .unwrap();
            assert_eq!(events.len(), 1);
            payment.apply_events(events);
            assert_eq!(payment.state(), PaymentState::Failed);
            assert_eq!(payment.failed_attempts(), attempt);

            let events = payment.retry(t0()).unwrap();
            payment.apply_events(events);
        }

        let events = payment
            .record_failure(Money::from_cents(1), Money::from_cents(2000), &policy, t0())
            .unwrap();
        assert_eq!(events.len(), 2);
        payment.apply_events(events);

        assert_eq!(payment.state(), PaymentState::Expired);
        assert_eq!(payment.failed_attempts(), policy.max_attempts);
        assert_eq!(payment.expiry_reason(), Some(ExpiryReason::AttemptsExhausted));
    }

    #[test]
    fn test_processed_at_marks_completion_only() {
        let policy = PaymentPolicy::default();
        let mut payment = pending(2000);
        let failed = t0() + Duration::seconds(10);
        let completed = t0() + Duration::seconds(60);

        let events = payment
            .record_failure(Money::from_cents(1), Money::from_cents(2000), &policy, failed)
            .unwrap();
        payment.apply_events(events);
        assert_eq!(payment.processed_at(), None);
        assert_eq!(payment.last_failed_at(), Some(failed));

        let events = payment.retry(t0() + Duration::seconds(30)).unwrap();
        payment.apply_events(events);
        let events = payment.complete(completed).unwrap();
        payment.apply_events(events);

        assert_eq!(payment.state(), PaymentState::Completed);
        assert_eq!(payment.processed_at(), Some(completed));
        assert_eq!(payment.last_failed_at(), Some(failed));
    }

    #[test]
    fn test_terminal_payment_rejects_everything() {
        let mut payment = pending(2000);
        let events = payment.complete(t0()).unwrap();
        payment.apply_events(events);
        assert!(payment.processed_at().is_some());

        assert!(payment.change_method(PaymentMethod::Cash).is_err());
        assert!(payment.retry(t0()).is_err());
        assert!(payment.expire(ExpiryReason::WindowElapsed, t0()).is_err());
        assert!(matches!(
            payment.evaluate(t0(), Money::from_cents(2000), &PaymentPolicy::default()),
            Err(PaymentError::InvalidStateTransition {
                current_state: PaymentState::Completed,
                ..
            })
        ));
    }

    #[test]
    fn test_change_method() {
        let mut payment = pending(2000);
        assert!(payment
            .change_method(PaymentMethod::CreditCard)
            .unwrap()
            .is_empty());

        let events = payment.change_method(PaymentMethod::BankTransfer).unwrap();
        payment.apply_events(events);
        assert_eq!(payment.method(), Some(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_confirm_requires_pending() {
        let mut payment = pending(2000);
        let events = payment
            .record_failure(
                Money::from_cents(1),
                Money::from_cents(2000),
                &PaymentPolicy::default(),
                t0(),
            )
            .unwrap();
        payment.apply_events(events);

        assert!(payment
            .evaluate(t0(), Money::from_cents(2000), &PaymentPolicy::default())
            .is_err());
    }
}
