//! Collaborator traits and in-memory implementations for the lifecycles.

pub mod clock;
pub mod directory;
pub mod notifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{Directory, InMemoryDirectory, Party, PartyStatus};
pub use notifier::{InMemoryNotifier, LogNotifier, Notification, Notifier};
