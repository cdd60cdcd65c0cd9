//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, LogFormat};
use crate::error::{AppError, Result};

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).map_err(|err| AppError::Config {
        name: "RUST_LOG",
        value: config.log_filter.clone(),
        reason: err.to_string(),
    })?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .map_err(|err| AppError::Telemetry(err.to_string()))
}

/// Starts the Prometheus exporter on `addr` and describes the recorded metrics.
pub fn init_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| AppError::Telemetry(err.to_string()))?;
    describe_metrics();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_histogram!(
        "unit_of_work_commit_seconds",
        metrics::Unit::Seconds,
        "Time spent committing a unit of work"
    );
    metrics::describe_counter!(
        "unit_of_work_conflicts_total",
        "Units of work rejected by a version or uniqueness conflict"
    );
    metrics::describe_counter!(
        "stock_conflicts_total",
        "Stock changes rejected by a concurrent writer"
    );
    metrics::describe_counter!("orders_created_total", "Orders created from carts");
    metrics::describe_counter!("orders_confirmed_total", "Orders confirmed with stock taken");
    metrics::describe_counter!("orders_canceled_total", "Orders canceled");
    metrics::describe_counter!("payments_completed_total", "Payments completed");
    metrics::describe_counter!("payments_failed_total", "Payment confirmations that failed");
    metrics::describe_counter!("payments_expired_total", "Payments expired");
    metrics::describe_counter!("purchases_received_total", "Purchases received into stock");
    metrics::describe_counter!("purchases_rescheduled_total", "Purchases rescheduled");
    metrics::describe_counter!(
        "compensations_total",
        "Failure markers committed apart from the failing operation"
    );
}
