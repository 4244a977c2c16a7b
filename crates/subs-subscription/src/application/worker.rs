//! Subscription reconciliation loop body.

use std::sync::Arc;

use async_trait::async_trait;
use subs_core::cancel::CancellationToken;
use subs_core::clock::SharedClock;
use subs_core::consumer::{ConsumeReport, Consumer};
use subs_core::error::DomainError;
use subs_core::history::EventHistoryLog;
use subs_core::message::{Message, SubscriptionMessage};
use subs_core::repository::{ClientRepository, MessageStore, SubscriptionRepository};
use subs_core::status::{MessageStatus, Operation, Status};
use subs_core::subscription::Subscription;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Applies queued subscription commands.
///
/// Messages carry no snapshot: every command is applied to the live row,
/// which must exist and whose client must exist.
pub struct SubscriptionWorker {
    clients: Arc<dyn ClientRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    messages: Arc<dyn MessageStore<SubscriptionMessage>>,
    history: EventHistoryLog<Subscription>,
    clock: SharedClock,
}

impl std::fmt::Debug for SubscriptionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionWorker").finish_non_exhaustive()
    }
}

impl SubscriptionWorker {
    /// Creates the worker.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        messages: Arc<dyn MessageStore<SubscriptionMessage>>,
        history: EventHistoryLog<Subscription>,
        clock: SharedClock,
    ) -> Self {
        Self {
            clients,
            subscriptions,
            messages,
            history,
            clock,
        }
    }

    async fn apply(&self, message: &SubscriptionMessage) -> Result<MessageStatus, DomainError> {
        let Some(mut subscription) = self.subscriptions.get(message.subscription_id).await? else {
            error!(
                subscription_id = %message.subscription_id,
                message_id = %message.id(),
                "subscription not found for message"
            );
            return Ok(MessageStatus::Failed);
        };

        if self.clients.get(subscription.client_id).await?.is_none() {
            error!(
                client_id = %subscription.client_id,
                subscription_id = %subscription.id,
                "client for subscription does not exist"
            );
            return Ok(MessageStatus::Failed);
        }

        let operation = message.operation();
        match operation {
            Operation::Create => {
                subscription.status = Status::Active;
                self.subscriptions.update(&subscription).await?;
                info!(subscription_id = %subscription.id, "subscription created and activated");
            }
            Operation::Update => {
                subscription.updated_at = self.clock.now();
                self.subscriptions.update(&subscription).await?;
            }
            Operation::Delete | Operation::Rollback => {}
        }

        self.history
            .add_event(
                subscription.id,
                operation,
                subscription.status,
                format!(
                    "Subscription {operation} operation processed with status {}.",
                    subscription.status
                ),
                None,
            )
            .await?;

        // Removing the row also removes its history, including the event above.
        if operation == Operation::Delete {
            self.subscriptions.delete(subscription.id).await?;
        }

        Ok(MessageStatus::Processed)
    }

    async fn still_pending(&self, message_id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .messages
            .get(message_id)
            .await?
            .is_some_and(|current| !current.header.status.is_terminal()))
    }
}

#[async_trait]
impl Consumer for SubscriptionWorker {
    fn name(&self) -> &'static str {
        "subscription-worker"
    }

    async fn consume(&self, cancel: &CancellationToken) -> Result<ConsumeReport, DomainError> {
        let due = self.messages.due(self.clock.now()).await?;
        let mut report = ConsumeReport::default();

        for message in due {
            if cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            if !self.still_pending(message.id()).await? {
                report.skipped += 1;
                continue;
            }

            let outcome = self.apply(&message).await?;
            self.messages
                .complete(message.id(), outcome, self.clock.now())
                .await?;

            if outcome == MessageStatus::Failed {
                report.failed += 1;
            } else {
                report.processed += 1;
            }
            debug!(
                subscription_id = %message.subscription_id,
                message_id = %message.id(),
                outcome = %outcome,
                "subscription message processed"
            );
        }

        Ok(report)
    }
}
