//! Purchase state machine.

use serde::{Deserialize, Serialize};

use crate::state_machine::{StateMachine, actions};

/// The state of a supplier purchase.
///
/// State transitions:
/// ```text
/// Created ──► Confirmed ──► Received ──► Closed
///                 │  ▲          ▲
///                 ▼  │          │
///            Rescheduled ───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PurchaseState {
    /// Lines can still change.
    #[default]
    Created,

    /// Sent to the supplier; awaiting delivery.
    Confirmed,

    /// Delivery matched the purchase and stock was increased.
    Received,

    /// Delivery was refused or postponed; awaiting a new delivery.
    Rescheduled,

    /// Archived (terminal state).
    Closed,
}

actions!(
    /// Operations that move a purchase.
    PurchaseAction {
        MutateItems => "modify items",
        Confirm => "confirm",
        Receive => "receive",
        Reschedule => "reschedule",
        Close => "close",
    }
);

impl PurchaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseState::Created => "Created",
            PurchaseState::Confirmed => "Confirmed",
            PurchaseState::Received => "Received",
            PurchaseState::Rescheduled => "Rescheduled",
            PurchaseState::Closed => "Closed",
        }
    }
}

impl StateMachine for PurchaseState {
    type Action = PurchaseAction;
    const ACTIONS: &'static [PurchaseAction] = PurchaseAction::ALL;

    fn next(self, action: PurchaseAction) -> Option<Self> {
        use PurchaseAction::*;
        use PurchaseState::*;

        match (self, action) {
            (Created, MutateItems) => Some(Created),
            (Created, Confirm) => Some(Confirmed),
            (Confirmed | Rescheduled, Receive) => Some(Received),
            (Confirmed | Rescheduled, Reschedule) => Some(Rescheduled),
            (Received, Close) => Some(Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_from_confirmed_or_rescheduled() {
        assert!(PurchaseState::Confirmed.allows(PurchaseAction::Receive));
        assert!(PurchaseState::Rescheduled.allows(PurchaseAction::Receive));
        assert!(!PurchaseState::Created.allows(PurchaseAction::Receive));
        assert!(!PurchaseState::Received.allows(PurchaseAction::Receive));
    }

    #[test]
    fn test_reschedule_reenters() {
        assert_eq!(
            PurchaseState::Rescheduled.next(PurchaseAction::Reschedule),
            Some(PurchaseState::Rescheduled)
        );
        assert!(!PurchaseState::Received.allows(PurchaseAction::Reschedule));
    }

    #[test]
    fn test_close_only_after_receipt() {
        assert!(PurchaseState::Received.allows(PurchaseAction::Close));
        assert!(!PurchaseState::Confirmed.allows(PurchaseAction::Close));
        assert!(PurchaseState::Closed.is_terminal());
    }
}
