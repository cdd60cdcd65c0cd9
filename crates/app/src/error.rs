//! Errors surfaced by the binary.

use event_store::EventStoreError;
use lifecycle::LifecycleError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid configuration: {name}={value}: {reason}")]
    Config {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),

    #[error("{0} has no id after creation")]
    MissingId(&'static str),

    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

pub type Result<T> = std::result::Result<T, AppError>;
