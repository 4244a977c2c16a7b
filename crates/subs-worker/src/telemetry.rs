//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Installs a JSON formatter filtered by `RUST_LOG`, defaulting to `info`.
///
/// # Errors
///
/// Returns `AppError::Telemetry` if a global subscriber is already set.
pub fn init() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .try_init()
        .map_err(|e| AppError::Telemetry(e.to_string()))
}
