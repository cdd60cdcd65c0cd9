//! Cart state machine.

use serde::{Deserialize, Serialize};

use crate::state_machine::{StateMachine, actions};

/// The state of a cart in its lifecycle.
///
/// State transitions:
/// ```text
/// Active ──checkout──► CheckedOut ──confirm──► Confirmed
///   ▲  │
///   │  └──abandon──► Abandoned
///   └──item change───────┘
/// ```
/// Any state except `Confirmed` may be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CartState {
    /// Items can be added, updated and removed.
    #[default]
    Active,

    /// Items are frozen and waiting for an order.
    CheckedOut,

    /// Left by the customer; changing an item reactivates it.
    Abandoned,

    /// The order created from this cart was confirmed (terminal state).
    Confirmed,
}

actions!(
    /// Operations that move a cart.
    CartAction {
        MutateItems => "modify items",
        CheckOut => "check out",
        Abandon => "abandon",
        Confirm => "confirm",
        Delete => "delete",
    }
);

impl CartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartState::Active => "Active",
            CartState::CheckedOut => "CheckedOut",
            CartState::Abandoned => "Abandoned",
            CartState::Confirmed => "Confirmed",
        }
    }
}

impl StateMachine for CartState {
    type Action = CartAction;
    const ACTIONS: &'static [CartAction] = CartAction::ALL;

    fn next(self, action: CartAction) -> Option<Self> {
        use CartAction::*;
        use CartState::*;

        match (self, action) {
            (Active | Abandoned, MutateItems) => Some(Active),
            (Active, CheckOut) => Some(CheckedOut),
            (Active, Abandon) => Some(Abandoned),
            (CheckedOut, Confirm) => Some(Confirmed),
            // Deletion hides the cart without changing its status.
            (Active | Abandoned | CheckedOut, Delete) => Some(self),
            _ => None,
        }
    }
}

impl std::fmt::Display for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
