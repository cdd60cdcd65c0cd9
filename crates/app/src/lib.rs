//! Retail core binary support: configuration, logging and metrics setup, and
//! a walkthrough of the lifecycles against the configured event store.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod walkthrough;

pub use config::{AppConfig, LogFormat};
pub use error::{AppError, Result};
pub use walkthrough::Summary;
