//! Subs worker host entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use subs_core::cancel::CancellationToken;
use subs_core::clock::SystemClock;
use subs_core::rng::SystemRng;
use subs_store::pg_store::PgStore;
use subs_worker::config::WorkerConfig;
use subs_worker::error::AppError;
use subs_worker::pipeline::Pipeline;
use subs_worker::{scheduler, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    telemetry::init()?;

    let config = WorkerConfig::from_env()?;
    info!(
        max_connections = config.max_connections,
        poll_interval_ms = u64::try_from(config.poll_interval.as_millis()).unwrap_or(u64::MAX),
        "starting subscription workers"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let pipeline = Pipeline::wire(
        Arc::new(PgStore::new(pool)),
        SystemClock::shared(),
        SystemRng::shared(),
    );

    let cancel = CancellationToken::new();
    let handles: Vec<_> = pipeline
        .workers()
        .into_iter()
        .map(|worker| tokio::spawn(scheduler::run(worker, config.poll_interval, cancel.clone())))
        .collect();

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    cancel.cancel();

    for handle in handles {
        handle.await?;
    }
    info!("workers stopped");
    Ok(())
}
