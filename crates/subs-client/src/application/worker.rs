//! Client reconciliation loop body.
//!
//! One [`ClientWorker::consume`] call sweeps every due client message in
//! ascending `callback_at` order and applies it to the `clients` table.

use std::sync::Arc;

use async_trait::async_trait;
use subs_core::cancel::CancellationToken;
use subs_core::client::Client;
use subs_core::clock::SharedClock;
use subs_core::consumer::{ConsumeReport, Consumer};
use subs_core::error::DomainError;
use subs_core::history::EventHistoryLog;
use subs_core::message::{ClientMessage, Message};
use subs_core::repository::{ClientRepository, MessageStore, SubscriptionRepository};
use subs_core::status::{MessageStatus, Operation, Status};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Applies queued client commands.
pub struct ClientWorker {
    clients: Arc<dyn ClientRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    messages: Arc<dyn MessageStore<ClientMessage>>,
    history: EventHistoryLog<Client>,
    clock: SharedClock,
}

impl std::fmt::Debug for ClientWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWorker").finish_non_exhaustive()
    }
}

impl ClientWorker {
    /// Creates the worker.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        messages: Arc<dyn MessageStore<ClientMessage>>,
        history: EventHistoryLog<Client>,
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

    async fn apply(&self, message: &ClientMessage) -> Result<MessageStatus, DomainError> {
        match message.operation() {
            Operation::Create => self.activate(message.client_id).await,
            Operation::Update => self.copy_snapshot(message).await,
            Operation::Delete => self.remove(message).await,
            Operation::Rollback => {
                debug!(message_id = %message.id(), "rollback has no client effect");
                Ok(MessageStatus::Processed)
            }
        }
    }

    async fn activate(&self, client_id: Uuid) -> Result<MessageStatus, DomainError> {
        let Some(mut client) = self.clients.get(client_id).await? else {
            error!(client_id = %client_id, "client not found in database");
            return Ok(MessageStatus::Failed);
        };

        if !client.status.can_activate() {
            warn!(
                client_id = %client_id,
                status = %client.status,
                "client is not in a valid state for creation"
            );
            return Ok(MessageStatus::Failed);
        }

        client.status = Status::Active;
        self.clients.update(&client).await?;
        self.history
            .add_event(
                client.id,
                Operation::Create,
                client.status,
                "Client activated successfully.",
                None,
            )
            .await?;
        Ok(MessageStatus::Processed)
    }

    async fn copy_snapshot(&self, message: &ClientMessage) -> Result<MessageStatus, DomainError> {
        let Some(mut client) = self.clients.get(message.client_id).await? else {
            debug!(client_id = %message.client_id, "client gone, nothing to update");
            return Ok(MessageStatus::Processed);
        };

        let snapshot = match message.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(message_id = %message.id(), error = %e, "unreadable client snapshot");
                return Ok(MessageStatus::Failed);
            }
        };

        client.apply_contact(&snapshot);
        self.clients.update(&client).await?;
        self.history
            .add_event(
                client.id,
                Operation::Update,
                client.status,
                "Client updated successfully.",
                None,
            )
            .await?;
        Ok(MessageStatus::Processed)
    }

    async fn remove(&self, message: &ClientMessage) -> Result<MessageStatus, DomainError> {
        let client_id = message.client_id;

        if self.subscriptions.has_for_client(client_id).await? {
            warn!(
                client_id = %client_id,
                "client cannot be deleted because they have associated subscriptions"
            );
            return Ok(MessageStatus::Failed);
        }

        self.clients.delete(client_id).await?;
        let failed = self
            .messages
            .fail_outstanding(client_id, message.id(), self.clock.now())
            .await?;
        let purged = self.history.purge(client_id).await?;

        info!(
            client_id = %client_id,
            failed_messages = failed,
            purged_events = purged,
            "client deleted"
        );
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
impl Consumer for ClientWorker {
    fn name(&self) -> &'static str {
        "client-worker"
    }

    async fn consume(&self, cancel: &CancellationToken) -> Result<ConsumeReport, DomainError> {
        let due = self.messages.due(self.clock.now()).await?;
        let mut report = ConsumeReport::default();

        for message in due {
            if cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }

            if !self.still_pending(message.id()).await? {
                debug!(message_id = %message.id(), "message already settled this cycle");
                report.skipped += 1;
                continue;
            }

            let outcome = self.apply(&message).await?;
            self.messages
                .complete(message.id(), outcome, self.clock.now())
                .await?;

            match outcome {
                MessageStatus::Failed => report.failed += 1,
                _ => report.processed += 1,
            }
            info!(
                client_id = %message.client_id,
                message_id = %message.id(),
                operation = %message.operation(),
                outcome = %outcome,
                "client message processed"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use subs_core::cancel::CancellationToken;
    use subs_core::client::Client;
    use subs_core::clock::SharedClock;
    use subs_core::consumer::{ConsumeReport, Consumer};
    use subs_core::error::DomainError;
    use subs_core::history::EventHistoryLog;
    use subs_core::message::{ClientMessage, Message};
    use subs_core::status::{MessageStatus, Operation, Status};
    use subs_core::subscription::{
        Currency, Discount, Payment, PaymentFrequency, PaymentMethod, Subscription,
    };
    use subs_test_support::{FailingStore, FixedClock, InMemoryStore};
    use uuid::Uuid;

    use super::ClientWorker;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn worker(store: &Arc<InMemoryStore>) -> ClientWorker {
        let clock: SharedClock = Arc::new(FixedClock(fixed_now()));
        ClientWorker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            EventHistoryLog::<Client>::new(store.clone(), clock.clone()),
            clock,
        )
    }

    fn client(status: Status) -> Client {
        Client {
            id: Uuid::new_v4(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            email: "test@user.com".to_owned(),
            phone: "5512991232566".to_owned(),
            status,
        }
    }

    /// A message as the bus would have stored it, visible `age` before now.
    fn queued(client: &Client, operation: Operation, age: TimeDelta) -> ClientMessage {
        let mut message = ClientMessage::new(client, operation).unwrap();
        message.header.created_at = fixed_now() - age - TimeDelta::seconds(4);
        message.header.callback_at = fixed_now() - age;
        message
    }

    fn subscription_for(client_id: Uuid) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            client_id,
            product_id: Uuid::new_v4(),
            status: Status::Active,
            payment: Payment {
                method: PaymentMethod::Pix,
                frequency: PaymentFrequency::Monthly,
                amount_cents: 4_990,
                discount: Discount::zero(),
                currency: Currency::local(fixed_now()),
            },
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    fn status_of(store: &InMemoryStore, message: &ClientMessage) -> MessageStatus {
        store
            .message::<ClientMessage>(message.id())
            .unwrap()
            .header
            .status
    }

    #[tokio::test]
    async fn test_create_activates_draft_client() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let draft = client(Status::Draft);
        store.seed_client(draft.clone());
        let message = queued(&draft, Operation::Create, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        // Act
        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(store.client(draft.id).unwrap().status, Status::Active);
        let history = store.history::<Client>(draft.id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status_at_event, Status::Active);
        assert_eq!(history[0].note, "Client activated successfully.");
        let stored = store.message::<ClientMessage>(message.id()).unwrap();
        assert_eq!(stored.header.status, MessageStatus::Processed);
        assert_eq!(stored.header.processed_at, Some(fixed_now()));
        assert_eq!(
            report,
            ConsumeReport {
                processed: 1,
                failed: 0,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_create_activates_pending_client() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let pending = client(Status::Pending);
        store.seed_client(pending.clone());
        let message = queued(&pending, Operation::Create, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        // Act
        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(store.client(pending.id).unwrap().status, Status::Active);
        let history = store.history::<Client>(pending.id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, Operation::Create);
        assert_eq!(history[0].status_at_event, Status::Active);
        assert_eq!(status_of(&store, &message), MessageStatus::Processed);
        assert_eq!(report.processed, 1);
    }

    #[tokio::test]
    async fn test_create_for_missing_client_fails_without_history() {
        let store = Arc::new(InMemoryStore::new());
        let ghost = client(Status::Draft);
        let message = queued(&ghost, Operation::Create, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status_of(&store, &message), MessageStatus::Failed);
        assert!(store.history::<Client>(ghost.id).is_empty());
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_create_for_already_active_client_fails() {
        let store = Arc::new(InMemoryStore::new());
        let active = client(Status::Active);
        store.seed_client(active.clone());
        let message = queued(&active, Operation::Create, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status_of(&store, &message), MessageStatus::Failed);
        assert_eq!(store.client(active.id).unwrap().status, Status::Active);
        assert!(store.history::<Client>(active.id).is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_enqueued_snapshot_not_live_row() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let live = client(Status::Active);
        store.seed_client(live.clone());
        let mut snapshot = live.clone();
        snapshot.first_name = "Snapshot".to_owned();
        snapshot.phone = "+5511999990000".to_owned();
        snapshot.status = Status::Suspended;
        let message = queued(&snapshot, Operation::Update, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        // Act
        worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        // Assert
        let row = store.client(live.id).unwrap();
        assert_eq!(row.first_name, "Snapshot");
        assert_eq!(row.phone, "+5511999990000");
        assert_eq!(row.status, Status::Active);
        let history = store.history::<Client>(live.id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].operation, Operation::Update);
        assert_eq!(history[0].note, "Client updated successfully.");
        assert_eq!(status_of(&store, &message), MessageStatus::Processed);
    }

    #[tokio::test]
    async fn test_update_for_missing_client_is_processed_silently() {
        let store = Arc::new(InMemoryStore::new());
        let ghost = client(Status::Active);
        let message = queued(&ghost, Operation::Update, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status_of(&store, &message), MessageStatus::Processed);
        assert!(store.history::<Client>(ghost.id).is_empty());
        assert_eq!(report.processed, 1);
    }

    #[tokio::test]
    async fn test_delete_refused_while_client_owns_a_subscription() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let owner = client(Status::Active);
        store.seed_client(owner.clone());
        store.seed_subscription(subscription_for(owner.id));
        let message = queued(&owner, Operation::Delete, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        // Act
        worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert!(store.client(owner.id).is_some());
        assert_eq!(status_of(&store, &message), MessageStatus::Failed);
    }

    #[tokio::test]
    async fn test_delete_removes_client_fails_outstanding_and_purges_history() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let doomed = client(Status::Active);
        store.seed_client(doomed.clone());
        let log = EventHistoryLog::<Client>::new(store.clone(), Arc::new(FixedClock(fixed_now())));
        log.add_event(doomed.id, Operation::Create, Status::Draft, "x", None)
            .await
            .unwrap();
        let delete = queued(&doomed, Operation::Delete, TimeDelta::seconds(3));
        let due_update = queued(&doomed, Operation::Update, TimeDelta::seconds(1));
        let future_update = queued(&doomed, Operation::Update, -TimeDelta::seconds(30));
        let mut settled = queued(&doomed, Operation::Create, TimeDelta::minutes(5));
        settled.header.status = MessageStatus::Processed;
        settled.header.processed_at = Some(fixed_now() - TimeDelta::minutes(4));
        for message in [&delete, &due_update, &future_update, &settled] {
            store.seed_message(message.clone());
        }

        // Act
        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert!(store.client(doomed.id).is_none());
        assert!(store.history::<Client>(doomed.id).is_empty());
        assert_eq!(status_of(&store, &delete), MessageStatus::Processed);
        assert_eq!(status_of(&store, &due_update), MessageStatus::Failed);
        assert_eq!(status_of(&store, &future_update), MessageStatus::Failed);
        assert_eq!(status_of(&store, &settled), MessageStatus::Processed);
        assert_eq!(
            report,
            ConsumeReport {
                processed: 1,
                failed: 0,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_messages_not_yet_visible_are_left_alone() {
        let store = Arc::new(InMemoryStore::new());
        let draft = client(Status::Draft);
        store.seed_client(draft.clone());
        let message = queued(&draft, Operation::Create, -TimeDelta::seconds(1));
        store.seed_message(message.clone());

        let report = worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(status_of(&store, &message), MessageStatus::Received);
        assert_eq!(store.client(draft.id).unwrap().status, Status::Draft);
    }

    #[tokio::test]
    async fn test_second_cycle_over_settled_messages_is_a_no_op() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let draft = client(Status::Draft);
        store.seed_client(draft.clone());
        store.seed_message(queued(&draft, Operation::Create, TimeDelta::seconds(2)));
        store.seed_message(queued(&client(Status::Draft), Operation::Create, TimeDelta::seconds(1)));
        let worker = worker(&store);
        worker.consume(&CancellationToken::new()).await.unwrap();
        let after_first = store.messages::<ClientMessage>();
        let history_after_first = store.history::<Client>(draft.id);

        // Act
        let report = worker.consume(&CancellationToken::new()).await.unwrap();

        // Assert
        assert_eq!(report, ConsumeReport::default());
        assert_eq!(store.messages::<ClientMessage>(), after_first);
        assert_eq!(store.history::<Client>(draft.id), history_after_first);
        for message in after_first {
            assert!(message.header.status.is_terminal());
            assert!(message.header.processed_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_the_next_message() {
        let store = Arc::new(InMemoryStore::new());
        let draft = client(Status::Draft);
        store.seed_client(draft.clone());
        let message = queued(&draft, Operation::Create, TimeDelta::seconds(1));
        store.seed_message(message.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = worker(&store).consume(&cancel).await;

        assert!(matches!(result, Err(DomainError::Cancelled)));
        assert_eq!(status_of(&store, &message), MessageStatus::Received);
    }

    #[tokio::test]
    async fn test_store_errors_abort_the_cycle() {
        let clock: SharedClock = Arc::new(FixedClock(fixed_now()));
        let worker = ClientWorker::new(
            Arc::new(FailingStore),
            Arc::new(FailingStore),
            Arc::new(FailingStore),
            EventHistoryLog::<Client>::new(Arc::new(FailingStore), clock.clone()),
            clock,
        );

        let result = worker.consume(&CancellationToken::new()).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_rollback_is_processed_without_effect() {
        let store = Arc::new(InMemoryStore::new());
        let active = client(Status::Active);
        store.seed_client(active.clone());
        let message = queued(&active, Operation::Rollback, TimeDelta::seconds(1));
        store.seed_message(message.clone());

        worker(&store)
            .consume(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status_of(&store, &message), MessageStatus::Processed);
        assert_eq!(store.client(active.id), Some(active.clone()));
        assert!(store.history::<Client>(active.id).is_empty());
        assert_eq!(message.operation(), Operation::Rollback);
    }
}
