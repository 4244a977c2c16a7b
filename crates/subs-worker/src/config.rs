//! Host configuration read from the environment.

use std::time::Duration;

use crate::error::AppError;

/// Default size of the database pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Default length of one worker cycle, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Settings for the worker host.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Length of one worker cycle.
    pub poll_interval: Duration,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("database_url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl WorkerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`WorkerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// `DATABASE_URL` is required. `DATABASE_MAX_CONNECTIONS` and
    /// `WORKER_POLL_INTERVAL_MS` fall back to their defaults when unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or blank, or
    /// if a numeric setting does not parse or is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_string())
            })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_positive::<u32>("DATABASE_MAX_CONNECTIONS", &raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let poll_interval_ms = match lookup("WORKER_POLL_INTERVAL_MS") {
            Some(raw) => parse_positive::<u64>("WORKER_POLL_INTERVAL_MS", &raw)?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            database_url,
            max_connections,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value: T = raw
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} must be a positive integer: {e}")))?;
    if value == T::default() {
        return Err(AppError::Config(format!("{key} must be greater than 0")));
    }
    Ok(value)
}
