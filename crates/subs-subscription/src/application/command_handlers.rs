//! Command handlers for the Subscription context.

use std::sync::Arc;

use subs_core::bus::Bus;
use subs_core::clock::SharedClock;
use subs_core::command::Command;
use subs_core::error::DomainError;
use subs_core::history::EventHistoryLog;
use subs_core::message::SubscriptionMessage;
use subs_core::repository::{ClientRepository, SubscriptionRepository};
use subs_core::status::{Operation, Status};
use subs_core::subscription::Subscription;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::commands::{
    CreateSubscription, DeleteSubscription, UpdateSubscription, UpdateSubscriptionStatus,
};
use crate::domain::validation;

/// Façade over the `subscriptions` table and the subscription queue.
#[derive(Clone)]
pub struct SubscriptionService {
    clients: Arc<dyn ClientRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    bus: Arc<dyn Bus<SubscriptionMessage>>,
    history: EventHistoryLog<Subscription>,
    clock: SharedClock,
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService").finish_non_exhaustive()
    }
}

impl SubscriptionService {
    /// Creates the façade.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        bus: Arc<dyn Bus<SubscriptionMessage>>,
        history: EventHistoryLog<Subscription>,
        clock: SharedClock,
    ) -> Self {
        Self {
            clients,
            subscriptions,
            bus,
            history,
            clock,
        }
    }

    /// Handles `CreateSubscription`: checks the owning client, stores the
    /// subscription as `Draft`, enqueues a Create command and records the
    /// `Draft` and `Pending` events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a field rule is broken or the
    /// client is missing or not active; nothing is written in that case.
    /// Storage errors are returned as-is, without undoing earlier writes.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, client_id = %command.client_id))]
    pub async fn create(&self, command: &CreateSubscription) -> Result<Subscription, DomainError> {
        let now = self.clock.now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            client_id: command.client_id,
            product_id: command.product_id,
            status: Status::Draft,
            payment: command.payment.clone().into_payment(now),
            created_at: command.created_at.unwrap_or(now),
            updated_at: command.updated_at.unwrap_or(now),
        };

        if let Err(e) = self.submit_new(&subscription).await {
            error!(
                subscription_id = %subscription.id,
                error = %e,
                "error while creating subscription"
            );
            return Err(e);
        }

        info!(
            subscription_id = %subscription.id,
            command = command.command_type(),
            "subscription sent to creation queue"
        );
        Ok(subscription)
    }

    async fn submit_new(&self, subscription: &Subscription) -> Result<(), DomainError> {
        validation::validate(subscription, self.clock.now())?;
        self.require_active_client(subscription.client_id).await?;

        self.subscriptions.insert(subscription).await?;
        self.history
            .add_event(
                subscription.id,
                Operation::Create,
                Status::Draft,
                "Subscription created as draft.",
                None,
            )
            .await?;

        self.bus
            .send(SubscriptionMessage::new(subscription.id, Operation::Create))
            .await?;
        self.history
            .add_event(
                subscription.id,
                Operation::Create,
                Status::Pending,
                "Subscription created and sent to processing queue.",
                None,
            )
            .await?;
        Ok(())
    }

    async fn require_active_client(&self, client_id: Uuid) -> Result<(), DomainError> {
        match self.clients.get(client_id).await? {
            None => Err(DomainError::Validation(
                "Client must exist and be active.".to_owned(),
            )),
            Some(client) if client.status != Status::Active => Err(DomainError::Validation(
                "Client must be active to create a subscription.".to_owned(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Handles `UpdateSubscription`: replaces status, product and payment,
    /// stamps `updated_at`, persists and enqueues an Update command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the subscription does not exist,
    /// `DomainError::Validation` if a field rule is broken, or any storage
    /// error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, subscription_id = %command.subscription_id))]
    pub async fn update(&self, command: &UpdateSubscription) -> Result<Subscription, DomainError> {
        let now = self.clock.now();
        let mut subscription = self.load(command.subscription_id).await?;
        subscription.status = command.status;
        subscription.product_id = command.product_id;
        subscription.payment = command.payment.clone();
        subscription.updated_at = now;

        validation::validate(&subscription, now)?;

        self.subscriptions.update(&subscription).await?;
        self.bus
            .send(SubscriptionMessage::new(subscription.id, Operation::Update))
            .await?;
        self.history
            .add_event(
                subscription.id,
                Operation::Update,
                subscription.status,
                "Subscription updated and sent to processing queue.",
                None,
            )
            .await?;

        info!(command = command.command_type(), "subscription sent to update queue");
        Ok(subscription)
    }

    /// Handles `UpdateSubscriptionStatus`: like [`Self::update`] but touches
    /// only the status. With `effective_at` set, the command becomes visible
    /// to the worker at that time instead of after the bus delay.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the subscription does not exist,
    /// `DomainError::Validation` if a field rule is broken, or any storage
    /// error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, subscription_id = %command.subscription_id, status = %command.status))]
    pub async fn update_status(
        &self,
        command: &UpdateSubscriptionStatus,
    ) -> Result<Subscription, DomainError> {
        let now = self.clock.now();
        let mut subscription = self.load(command.subscription_id).await?;
        subscription.status = command.status;
        subscription.updated_at = now;

        validation::validate(&subscription, now)?;

        self.subscriptions.update(&subscription).await?;
        let mut message = SubscriptionMessage::new(subscription.id, Operation::Update);
        if let Some(at) = command.effective_at {
            message = message.deliver_at(at);
        }
        self.bus.send(message).await?;
        self.history
            .add_event(
                subscription.id,
                Operation::Update,
                subscription.status,
                format!(
                    "Subscription status updated to {} and sent to processing queue.",
                    command.status
                ),
                None,
            )
            .await?;

        info!(command = command.command_type(), "subscription sent to update queue");
        Ok(subscription)
    }

    /// Handles `DeleteSubscription`: enqueues a Delete command. The row stays
    /// until the worker removes it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the subscription does not exist, or
    /// any storage error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, subscription_id = %command.subscription_id))]
    pub async fn delete(&self, command: &DeleteSubscription) -> Result<(), DomainError> {
        let subscription = self.load(command.subscription_id).await?;

        self.bus
            .send(SubscriptionMessage::new(subscription.id, Operation::Delete))
            .await?;
        self.history
            .add_event(
                subscription.id,
                Operation::Delete,
                subscription.status,
                "Subscription sent to deletion queue.",
                None,
            )
            .await?;

        info!(command = command.command_type(), "subscription sent to deletion queue");
        Ok(())
    }

    async fn load(&self, subscription_id: Uuid) -> Result<Subscription, DomainError> {
        self.subscriptions
            .get(subscription_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "subscription",
                id: subscription_id,
            })
    }
}
