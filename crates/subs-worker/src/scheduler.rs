//! Duty-cycle driver for a [`Consumer`].

use std::sync::Arc;
use std::time::Duration;

use subs_core::cancel::CancellationToken;
use subs_core::consumer::Consumer;
use subs_core::error::DomainError;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Runs `consumer` once per `period` until `cancel` fires. Returns the number
/// of cycles started.
///
/// A cycle that finishes early sleeps for the rest of the period; one that
/// overruns is followed immediately by the next. Errors other than
/// cancellation are logged and the loop carries on.
pub async fn run(consumer: Arc<dyn Consumer>, period: Duration, cancel: CancellationToken) -> u64 {
    let worker = consumer.name();
    let mut cycles = 0_u64;
    let period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
    info!(worker, period_ms, "worker started");

    while !cancel.is_cancelled() {
        let started = Instant::now();
        cycles += 1;

        match consumer.consume(&cancel).await {
            Ok(report) if report.total() > 0 => info!(
                worker,
                processed = report.processed,
                failed = report.failed,
                skipped = report.skipped,
                "cycle finished"
            ),
            Ok(_) => debug!(worker, "nothing due"),
            Err(DomainError::Cancelled) => break,
            Err(err) => error!(worker, error = %err, "cycle failed"),
        }

        let remaining = period.saturating_sub(started.elapsed());
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(remaining) => {}
        }
    }

    info!(worker, cycles, "worker stopped");
    cycles
}
