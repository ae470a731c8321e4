//! # BookHaven Worker
//!
//! Runs the expiry sweeper: once per interval, announcements and discounts
//! whose end date has passed are switched off.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... SWEEP_INTERVAL_SECS=1 cargo run -p bookhaven-worker
//! ```

use anyhow::Context;
use bookhaven_shared::db::pool::{close_pool, create_pool};
use bookhaven_worker::{config::WorkerConfig, sweeper::ExpirySweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookhaven_worker=debug,bookhaven_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("BookHaven Worker v{} starting", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;

    // Schema is owned by the API server, which migrates on startup
    let pool = create_pool(config.database.clone())
        .await
        .context("failed to connect to the database")?;

    let sweeper = ExpirySweeper::with_config(pool.clone(), config.sweeper);
    let shutdown = sweeper.shutdown_token();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    sweeper.run().await;

    close_pool(pool).await;
    Ok(())
}
