//! Wiring of both contexts over one storage backend.

use std::sync::Arc;

use subs_client::application::command_handlers::ClientService;
use subs_client::application::worker::ClientWorker;
use subs_core::bus::{Bus, TableBus};
use subs_core::client::Client;
use subs_core::clock::SharedClock;
use subs_core::consumer::Consumer;
use subs_core::history::EventHistoryLog;
use subs_core::message::{ClientMessage, SubscriptionMessage};
use subs_core::repository::{
    ClientRepository, HistoryStore, MessageStore, SubscriptionRepository,
};
use subs_core::rng::SharedRng;
use subs_core::subscription::Subscription;
use subs_subscription::application::command_handlers::SubscriptionService;
use subs_subscription::application::worker::SubscriptionWorker;

/// A backend holding every table the pipeline touches.
pub trait Storage:
    ClientRepository
    + SubscriptionRepository
    + MessageStore<ClientMessage>
    + MessageStore<SubscriptionMessage>
    + HistoryStore<Client>
    + HistoryStore<Subscription>
    + 'static
{
}

impl<T> Storage for T where
    T: ClientRepository
        + SubscriptionRepository
        + MessageStore<ClientMessage>
        + MessageStore<SubscriptionMessage>
        + HistoryStore<Client>
        + HistoryStore<Subscription>
        + 'static
{
}

/// Producers and consumers of both queues, sharing one clock and RNG.
pub struct Pipeline {
    /// Client façade.
    pub clients: ClientService,
    /// Subscription façade.
    pub subscriptions: SubscriptionService,
    /// Client queue consumer.
    pub client_worker: Arc<ClientWorker>,
    /// Subscription queue consumer.
    pub subscription_worker: Arc<SubscriptionWorker>,
}

impl Pipeline {
    /// Builds the services and workers over `store`.
    pub fn wire<S: Storage>(store: Arc<S>, clock: SharedClock, rng: SharedRng) -> Self {
        let client_repo: Arc<dyn ClientRepository> = store.clone();
        let subscription_repo: Arc<dyn SubscriptionRepository> = store.clone();
        let client_queue: Arc<dyn MessageStore<ClientMessage>> = store.clone();
        let subscription_queue: Arc<dyn MessageStore<SubscriptionMessage>> = store.clone();
        let client_history: Arc<dyn HistoryStore<Client>> = store.clone();
        let subscription_history: Arc<dyn HistoryStore<Subscription>> = store;

        let client_log = EventHistoryLog::new(client_history, clock.clone());
        let subscription_log = EventHistoryLog::new(subscription_history, clock.clone());

        let client_bus: Arc<dyn Bus<ClientMessage>> = Arc::new(TableBus::new(
            client_queue.clone(),
            clock.clone(),
            rng.clone(),
        ));
        let subscription_bus: Arc<dyn Bus<SubscriptionMessage>> = Arc::new(TableBus::new(
            subscription_queue.clone(),
            clock.clone(),
            rng,
        ));

        Self {
            clients: ClientService::new(client_repo.clone(), client_bus, client_log.clone()),
            subscriptions: SubscriptionService::new(
                client_repo.clone(),
                subscription_repo.clone(),
                subscription_bus,
                subscription_log.clone(),
                clock.clone(),
            ),
            client_worker: Arc::new(ClientWorker::new(
                client_repo.clone(),
                subscription_repo.clone(),
                client_queue,
                client_log,
                clock.clone(),
            )),
            subscription_worker: Arc::new(SubscriptionWorker::new(
                client_repo,
                subscription_repo,
                subscription_queue,
                subscription_log,
                clock,
            )),
        }
    }

    /// Both workers, client first.
    #[must_use]
    pub fn workers(&self) -> Vec<Arc<dyn Consumer>> {
        vec![
            self.client_worker.clone() as Arc<dyn Consumer>,
            self.subscription_worker.clone() as Arc<dyn Consumer>,
        ]
    }
}
