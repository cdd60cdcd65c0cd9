//! Retail core entry point.

use app::{AppConfig, Result, telemetry, walkthrough};
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};

async fn run<S: EventStore + Clone>(store: S, config: &AppConfig) -> Result<()> {
    let summary = walkthrough::run(store, config.lifecycle).await?;
    tracing::info!(
        order_id = %summary.order_id,
        order_state = %summary.order_state,
        total = %summary.order_total,
        payment_state = %summary.payment_state,
        purchase_state = %summary.purchase_state,
        stock = ?summary.stock,
        "walkthrough finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config)?;

    // 2. Prometheus exporter, when asked for
    if let Some(addr) = config.metrics_addr {
        telemetry::init_metrics(addr)?;
    }

    // 3. Event store
    match &config.database_url {
        Some(url) => {
            let store = PostgresEventStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using postgres event store");
            run(store, &config).await
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory event store");
            run(InMemoryEventStore::new(), &config).await
        }
    }
}
