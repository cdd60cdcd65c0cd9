//! Order state machine.

use serde::{Deserialize, Serialize};

use crate::state_machine::{StateMachine, actions};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──► Confirmed ──► Paid ──► Shipped ──► Delivered
///    │            │           │
///    └────────────┴───────────┴──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Items copied from the cart; items can still change.
    #[default]
    Created,

    /// Stock has been taken; awaiting payment.
    Confirmed,

    /// Payment completed.
    Paid,

    /// Handed to the carrier; can no longer be canceled.
    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Canceled before shipment (terminal state).
    Canceled,
}

actions!(
    /// Operations that move an order.
    OrderAction {
        MutateItems => "modify items",
        Confirm => "confirm",
        Pay => "pay",
        Ship => "ship",
        Deliver => "deliver",
        Cancel => "cancel",
    }
);

impl OrderState {
    /// Returns true if stock was taken for this order and not yet returned.
    pub fn holds_stock(&self) -> bool {
        matches!(self, OrderState::Confirmed | OrderState::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "Created",
            OrderState::Confirmed => "Confirmed",
            OrderState::Paid => "Paid",
            OrderState::Shipped => "Shipped",
            OrderState::Delivered => "Delivered",
            OrderState::Canceled => "Canceled",
        }
    }
}

impl StateMachine for OrderState {
    type Action = OrderAction;
    const ACTIONS: &'static [OrderAction] = OrderAction::ALL;

    fn next(self, action: OrderAction) -> Option<Self> {
        use OrderAction::*;
        use OrderState::*;

        match (self, action) {
            (Created, MutateItems) => Some(Created),
            (Created, Confirm) => Some(Confirmed),
            (Confirmed, Pay) => Some(Paid),
            (Paid, Ship) => Some(Shipped),
            (Shipped, Deliver) => Some(Delivered),
            (Created | Confirmed | Paid, Cancel) => Some(Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_created() {
        assert_eq!(OrderState::default(), OrderState::Created);
    }

    #[test]
    fn test_only_created_can_modify_items() {
        assert!(OrderState::Created.allows(OrderAction::MutateItems));
        for state in [
            OrderState::Confirmed,
            OrderState::Paid,
            OrderState::Shipped,
            OrderState::Delivered,
            OrderState::Canceled,
        ] {
            assert!(!state.allows(OrderAction::MutateItems), "{state}");
        }
    }

    #[test]
    fn test_forward_path() {
        let mut state = OrderState::Created;
        for action in [
            OrderAction::Confirm,
            OrderAction::Pay,
            OrderAction::Ship,
            OrderAction::Deliver,
        ] {
            state = state.next(action).unwrap();
        }
        assert_eq!(state, OrderState::Delivered);
    }

    #[test]
    fn test_cancel_is_illegal_once_shipped() {
        assert!(OrderState::Created.allows(OrderAction::Cancel));
        assert!(OrderState::Confirmed.allows(OrderAction::Cancel));
        assert!(OrderState::Paid.allows(OrderAction::Cancel));
        assert!(!OrderState::Shipped.allows(OrderAction::Cancel));
        assert!(!OrderState::Delivered.allows(OrderAction::Cancel));
        assert!(!OrderState::Canceled.allows(OrderAction::Cancel));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderState::Shipped.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Canceled.is_terminal());
    }

    #[test]
    fn test_holds_stock() {
        assert!(!OrderState::Created.holds_stock());
        assert!(OrderState::Confirmed.holds_stock());
        assert!(OrderState::Paid.holds_stock());
        assert!(!OrderState::Shipped.holds_stock());
    }
}
