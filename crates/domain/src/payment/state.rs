//! Payment state machine.

use serde::{Deserialize, Serialize};

use crate::state_machine::{StateMachine, actions};

/// The state of a payment.
///
/// State transitions:
/// ```text
/// Pending ──complete──► Completed
///  │  ▲  │
///  │  │  └──fail──► Failed ──expire──► Expired
///  │  └───retry──────┘
///  └──────────expire──────────────────► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentState {
    /// Awaiting confirmation.
    #[default]
    Pending,

    /// Settled (terminal state).
    Completed,

    /// The last confirmation failed; the payment may be retried.
    Failed,

    /// Window elapsed or retries exhausted (terminal state).
    Expired,
}

actions!(
    /// Operations that move a payment.
    PaymentAction {
        ChangeMethod => "change method",
        Complete => "complete",
        Fail => "fail",
        Retry => "retry",
        Expire => "expire",
    }
);

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "Pending",
            PaymentState::Completed => "Completed",
            PaymentState::Failed => "Failed",
            PaymentState::Expired => "Expired",
        }
    }
}

impl StateMachine for PaymentState {
    type Action = PaymentAction;
    const ACTIONS: &'static [PaymentAction] = PaymentAction::ALL;

    fn next(self, action: PaymentAction) -> Option<Self> {
        use PaymentAction::*;
        use PaymentState::*;

        match (self, action) {
            (Pending | Failed, ChangeMethod) => Some(self),
            (Pending, Complete) => Some(Completed),
            (Pending, Fail) => Some(Failed),
            (Failed, Retry) => Some(Pending),
            (Pending | Failed, Expire) => Some(Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a payment expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryReason {
    /// Confirmation came after the payment window closed.
    WindowElapsed,

    /// The failed-attempt counter reached its cap.
    AttemptsExhausted,
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpiryReason::WindowElapsed => f.write_str("payment window elapsed"),
            ExpiryReason::AttemptsExhausted => f.write_str("retry attempts exhausted"),
        }
    }
}

/// How a payment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    Cash,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PaymentMethod::CreditCard => "credit card",
            PaymentMethod::DebitCard => "debit card",
            PaymentMethod::BankTransfer => "bank transfer",
            PaymentMethod::Cash => "cash",
        };
        f.write_str(name)
    }
}
