//! The table-backed message bus.
//!
//! There is no broker: `send` writes a row with a delayed visibility time and
//! `receive` atomically claims the earliest visible row. The delay simulates
//! delivery latency.

use std::marker::PhantomData;
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::clock::SharedClock;
use crate::error::DomainError;
use crate::message::Message;
use crate::repository::MessageStore;
use crate::rng::SharedRng;
use crate::status::MessageStatus;

/// Smallest delivery delay, in whole seconds.
pub const MIN_DELAY_SECS: u32 = 4;
/// Upper bound (exclusive) of the delivery delay, in whole seconds.
pub const MAX_DELAY_SECS: u32 = 7;

/// Producer/consumer contract over messages of type `M`.
#[async_trait]
pub trait Bus<M: Message>: Send + Sync {
    /// Stamps and persists `message`, returning it as stored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the row cannot be written.
    async fn send(&self, message: M) -> Result<M, DomainError>;

    /// Claims the earliest visible message, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` has fired, or a storage
    /// error.
    async fn receive(&self, cancel: &CancellationToken) -> Result<Option<M>, DomainError>;
}

/// [`Bus`] implementation over a [`MessageStore`].
pub struct TableBus<M: Message> {
    store: Arc<dyn MessageStore<M>>,
    clock: SharedClock,
    rng: SharedRng,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> TableBus<M> {
    /// Creates a bus writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore<M>>, clock: SharedClock, rng: SharedRng) -> Self {
        Self {
            store,
            clock,
            rng,
            _message: PhantomData,
        }
    }

    /// Draws a delay in `[MIN_DELAY_SECS, MAX_DELAY_SECS)` whole seconds.
    fn jitter(&self) -> TimeDelta {
        let secs = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.next_u32_range(MIN_DELAY_SECS, MAX_DELAY_SECS - 1)
        };
        TimeDelta::seconds(i64::from(secs))
    }

    fn callback_at(&self, message: &M, now: DateTime<Utc>) -> DateTime<Utc> {
        match message.requested_callback_at() {
            Some(requested) => requested.max(now),
            None => now + self.jitter(),
        }
    }
}

impl<M: Message> std::fmt::Debug for TableBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBus")
            .field("queue", &M::QUEUE)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<M: Message> Bus<M> for TableBus<M> {
    async fn send(&self, mut message: M) -> Result<M, DomainError> {
        let now = self.clock.now();
        let callback_at = self.callback_at(&message, now);

        let header = message.header_mut();
        header.created_at = now;
        header.status = MessageStatus::Received;
        header.callback_at = callback_at;
        header.processed_at = None;

        self.store.insert(&message).await?;

        info!(
            queue = M::QUEUE,
            message_id = %message.id(),
            entity_id = %message.entity_id(),
            operation = %message.operation(),
            callback_at = %callback_at,
            "message sent"
        );
        Ok(message)
    }

    async fn receive(&self, cancel: &CancellationToken) -> Result<Option<M>, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let claimed = self.store.claim_next(self.clock.now()).await?;
        if let Some(message) = &claimed {
            debug!(
                queue = M::QUEUE,
                message_id = %message.id(),
                "message received"
            );
        }
        Ok(claimed)
    }
}
