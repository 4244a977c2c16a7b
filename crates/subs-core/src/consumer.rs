//! The worker-side contract.

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::error::DomainError;

/// Outcome counts of one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Messages marked `Processed`.
    pub processed: u32,
    /// Messages marked `Failed`.
    pub failed: u32,
    /// Due messages that were already terminal when their turn came.
    pub skipped: u32,
}

impl ConsumeReport {
    /// Total messages looked at.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.processed + self.failed + self.skipped
    }
}

/// A reconciliation loop body: sweeps every due message once.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one cycle.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` when `cancel` fires between messages,
    /// or the first storage error encountered.
    async fn consume(&self, cancel: &CancellationToken) -> Result<ConsumeReport, DomainError>;
}
