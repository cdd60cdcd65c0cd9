//! Product status and its transition table.

use serde::{Deserialize, Serialize};

use crate::state_machine::{StateMachine, actions};

/// Stock status of a product.
///
/// ```text
/// Active ◄──increase── Exhausted
///   │  └──decrease to 0──►  │
///   └──────► Eliminated ◄───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    /// Stock is above zero and the product can be sold.
    #[default]
    Active,

    /// Stock is zero; increases bring it back.
    Exhausted,

    /// Withdrawn from sale (terminal state).
    Eliminated,
}

actions!(
    /// Operations on a product's stock.
    ProductAction {
        DecreaseStock => "decrease stock",
        IncreaseStock => "increase stock",
        Eliminate => "eliminate",
    }
);

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "Active",
            ProductStatus::Exhausted => "Exhausted",
            ProductStatus::Eliminated => "Eliminated",
        }
    }
}

impl StateMachine for ProductStatus {
    type Action = ProductAction;
    const ACTIONS: &'static [ProductAction] = ProductAction::ALL;

    /// Returns the nominal next status. Whether a decrease exhausts the
    /// product depends on the stock and is decided when the event is applied.
    fn next(self, action: ProductAction) -> Option<Self> {
        use ProductAction::*;
        use ProductStatus::*;

        match (self, action) {
            (Active, DecreaseStock) => Some(Active),
            (Active | Exhausted, IncreaseStock) => Some(Active),
            (Active | Exhausted, Eliminate) => Some(Eliminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_sells() {
        assert!(ProductStatus::Active.allows(ProductAction::DecreaseStock));
        assert!(!ProductStatus::Exhausted.allows(ProductAction::DecreaseStock));
        assert!(!ProductStatus::Eliminated.allows(ProductAction::DecreaseStock));
    }

    #[test]
    fn test_exhausted_restocks_to_active() {
        assert_eq!(
            ProductStatus::Exhausted.next(ProductAction::IncreaseStock),
            Some(ProductStatus::Active)
        );
        assert_eq!(ProductStatus::Eliminated.next(ProductAction::IncreaseStock), None);
    }

    #[test]
    fn test_eliminated_is_terminal() {
        assert!(ProductStatus::Eliminated.is_terminal());
        assert!(!ProductStatus::Exhausted.is_terminal());
    }
}
