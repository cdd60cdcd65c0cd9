//! Application configuration loaded from environment variables.

use std::net::SocketAddr;

use lifecycle::LifecycleConfig;

use crate::error::{AppError, Result};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected text or json")),
        }
    }
}

/// Binary configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: Postgres event store; the in-memory store is used when unset
/// - `METRICS_ADDR`: Prometheus listener address; no exporter when unset
///
/// plus the payment settings read by [`LifecycleConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_filter: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub metrics_addr: Option<SocketAddr>,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.lifecycle = LifecycleConfig::from_env();
        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Payment settings keep their defaults here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log_format = match set("LOG_FORMAT") {
            Some(value) => value.parse::<LogFormat>().map_err(|reason| AppError::Config {
                name: "LOG_FORMAT",
                value,
                reason,
            })?,
            None => defaults.log_format,
        };

        let metrics_addr = match set("METRICS_ADDR") {
            Some(value) => Some(value.trim().parse().map_err(
                |err: std::net::AddrParseError| AppError::Config {
                    name: "METRICS_ADDR",
                    value: value.clone(),
                    reason: err.to_string(),
                },
            )?),
            None => None,
        };

        Ok(Self {
            log_filter: set("RUST_LOG").unwrap_or(defaults.log_filter),
            log_format,
            database_url: set("DATABASE_URL"),
            metrics_addr,
            lifecycle: defaults.lifecycle,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            metrics_addr: None,
            lifecycle: LifecycleConfig::default(),
        }
    }
}
