//! Transition tables.
//!
//! Every aggregate status implements [`StateMachine`]: a single `next` function
//! maps (current status, action) to the following status, or `None` when the
//! action is illegal. Aggregates consult the table before emitting events
//! instead of scattering per-method status checks.

use std::fmt::{Debug, Display};

pub trait StateMachine: Copy + Eq + Debug + Display + Send + Sync + 'static {
    /// The operations that move this status.
    type Action: Copy + Eq + Debug + Display + Send + Sync + 'static;

    /// Every action, used to derive terminal states.
    const ACTIONS: &'static [Self::Action];

    /// Returns the status after `action`, or `None` if it is illegal here.
    fn next(self, action: Self::Action) -> Option<Self>;

    fn allows(self, action: Self::Action) -> bool {
        self.next(action).is_some()
    }

    /// Returns true if no action is legal from this status.
    fn is_terminal(self) -> bool {
        Self::ACTIONS.iter().all(|action| self.next(*action).is_none())
    }

    /// Returns the actions legal from this status.
    fn legal_actions(self) -> Vec<Self::Action> {
        Self::ACTIONS
            .iter()
            .copied()
            .filter(|action| self.allows(*action))
            .collect()
    }
}

/// Declares a `Copy` action enum with `as_str` and `Display`.
macro_rules! actions {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use actions;

#[cfg(test)]
mod tests {
    use super::*;

    actions!(LightAction { Toggle => "toggle", Break => "break" });

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        On,
        Off,
        Broken,
    }

    impl Display for Light {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl StateMachine for Light {
        type Action = LightAction;
        const ACTIONS: &'static [LightAction] = LightAction::ALL;

        fn next(self, action: LightAction) -> Option<Self> {
            match (self, action) {
                (Light::On, LightAction::Toggle) => Some(Light::Off),
                (Light::Off, LightAction::Toggle) => Some(Light::On),
                (Light::On | Light::Off, LightAction::Break) => Some(Light::Broken),
                (Light::Broken, _) => None,
            }
        }
    }

    #[test]
    fn terminal_when_nothing_is_legal() {
        assert!(!Light::On.is_terminal());
        assert!(Light::Broken.is_terminal());
    }

    #[test]
    fn legal_actions_follow_table() {
        assert_eq!(
            Light::Off.legal_actions(),
            vec![LightAction::Toggle, LightAction::Break]
        );
        assert!(Light::Broken.legal_actions().is_empty());
        assert_eq!(LightAction::Break.to_string(), "break");
    }
}
