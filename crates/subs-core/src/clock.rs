//! Wall-clock access.
//!
//! Services, buses and workers never call `Utc::now()` directly; they read
//! time through a [`Clock`] so tests can pin or advance it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock handle shared by services, buses and workers.
pub type SharedClock = Arc<dyn Clock>;

/// Production clock backed by the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Wraps the system clock in a [`SharedClock`] handle.
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
