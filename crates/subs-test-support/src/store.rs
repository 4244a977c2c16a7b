//! In-memory and failing implementations of every storage port.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use subs_core::client::Client;
use subs_core::error::DomainError;
use subs_core::history::EventHistory;
use subs_core::message::{ClientMessage, Message, SubscriptionMessage};
use subs_core::repository::{
    ClientRepository, HistoryStore, MessageStore, Page, PageRequest, SubscriptionRepository,
};
use subs_core::status::MessageStatus;
use subs_core::subscription::Subscription;
use uuid::Uuid;

/// Row storage behind [`InMemoryStore`].
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct Tables {
    clients: Vec<Client>,
    subscriptions: Vec<Subscription>,
    client_messages: Vec<ClientMessage>,
    subscription_messages: Vec<SubscriptionMessage>,
    client_history: Vec<EventHistory>,
    subscription_history: Vec<EventHistory>,
}

/// Selects the queue table a message type lives in.
pub trait QueueTable: Message {
    #[doc(hidden)]
    fn rows(tables: &mut Tables) -> &mut Vec<Self>;
}

impl QueueTable for ClientMessage {
    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.client_messages
    }
}

impl QueueTable for SubscriptionMessage {
    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.subscription_messages
    }
}

/// Selects the history table an entity type writes to.
pub trait HistoryTable {
    #[doc(hidden)]
    fn rows(tables: &mut Tables) -> &mut Vec<EventHistory>;
}

impl HistoryTable for Client {
    fn rows(tables: &mut Tables) -> &mut Vec<EventHistory> {
        &mut tables.client_history
    }
}

impl HistoryTable for Subscription {
    fn rows(tables: &mut Tables) -> &mut Vec<EventHistory> {
        &mut tables.subscription_history
    }
}

/// Every table of the pipeline behind one mutex.
///
/// Deleting a subscription also deletes its history, mirroring the
/// `ON DELETE CASCADE` of the PostgreSQL schema. Client history is not
/// cascaded.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Stores a message row exactly as given, bypassing the bus.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed_message<M: QueueTable>(&self, message: M) {
        M::rows(&mut self.lock()).push(message);
    }

    /// Stores a client row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed_client(&self, client: Client) {
        self.lock().clients.push(client);
    }

    /// Stores a subscription row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed_subscription(&self, subscription: Subscription) {
        self.lock().subscriptions.push(subscription);
    }

    /// Snapshot of every message of one queue, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages<M: QueueTable>(&self) -> Vec<M> {
        M::rows(&mut self.lock()).clone()
    }

    /// Snapshot of one message.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn message<M: QueueTable>(&self, id: Uuid) -> Option<M> {
        M::rows(&mut self.lock()).iter().find(|m| m.id() == id).cloned()
    }

    /// Snapshot of one client row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn client(&self, id: Uuid) -> Option<Client> {
        self.lock().clients.iter().find(|c| c.id == id).cloned()
    }

    /// Snapshot of one subscription row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn subscription(&self, id: Uuid) -> Option<Subscription> {
        self.lock().subscriptions.iter().find(|s| s.id == id).cloned()
    }

    /// Snapshot of the history of one entity of type `E`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn history<E: HistoryTable>(&self, entity_id: Uuid) -> Vec<EventHistory> {
        E::rows(&mut self.lock())
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ClientRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Client>, DomainError> {
        Ok(self.client(id))
    }

    async fn insert(&self, client: &Client) -> Result<(), DomainError> {
        self.lock().clients.push(client.clone());
        Ok(())
    }

    async fn update(&self, client: &Client) -> Result<(), DomainError> {
        let mut tables = self.lock();
        match tables.clients.iter_mut().find(|c| c.id == client.id) {
            Some(row) => {
                *row = client.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound {
                entity: "client",
                id: client.id,
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.lock();
        let before = tables.clients.len();
        tables.clients.retain(|c| c.id != id);
        Ok(tables.clients.len() < before)
    }

    async fn list(&self) -> Result<Vec<Client>, DomainError> {
        Ok(self.lock().clients.clone())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscription(id))
    }

    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.lock().subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut tables = self.lock();
        match tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
        {
            Some(row) => {
                *row = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound {
                entity: "subscription",
                id: subscription.id,
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.lock();
        let before = tables.subscriptions.len();
        tables.subscriptions.retain(|s| s.id != id);
        let removed = tables.subscriptions.len() < before;
        if removed {
            tables.subscription_history.retain(|e| e.entity_id != id);
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.lock().subscriptions.clone())
    }

    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn has_for_client(&self, client_id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .lock()
            .subscriptions
            .iter()
            .any(|s| s.client_id == client_id))
    }
}

#[async_trait]
impl<M: QueueTable> MessageStore<M> for InMemoryStore {
    async fn insert(&self, message: &M) -> Result<(), DomainError> {
        M::rows(&mut self.lock()).push(message.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<M>, DomainError> {
        Ok(self.message(id))
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<M>, DomainError> {
        let mut due: Vec<M> = M::rows(&mut self.lock())
            .iter()
            .filter(|m| m.header().is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|m| m.header().callback_at);
        Ok(due)
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<M>, DomainError> {
        let mut tables = self.lock();
        let next = M::rows(&mut tables)
            .iter_mut()
            .filter(|m| m.header().is_due(now))
            .min_by_key(|m| m.header().callback_at);
        Ok(next.map(|message| {
            let header = message.header_mut();
            header.status = MessageStatus::Processed;
            header.processed_at = Some(now);
            message.clone()
        }))
    }

    async fn complete(
        &self,
        id: Uuid,
        status: MessageStatus,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tables = self.lock();
        Ok(M::rows(&mut tables)
            .iter_mut()
            .find(|m| m.id() == id)
            .is_some_and(|m| m.header_mut().finish(status, processed_at)))
    }

    async fn fail_outstanding(
        &self,
        entity_id: Uuid,
        keep: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let mut tables = self.lock();
        let mut touched = 0;
        for message in M::rows(&mut tables)
            .iter_mut()
            .filter(|m| m.entity_id() == entity_id && m.id() != keep)
        {
            if message.header_mut().finish(MessageStatus::Failed, at) {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn page(&self, request: PageRequest) -> Result<Page<M>, DomainError> {
        let mut rows = self.messages::<M>();
        rows.sort_by(|a, b| b.header().created_at.cmp(&a.header().created_at));
        Ok(request.slice(&rows))
    }

    async fn purge_pending(&self) -> Result<u64, DomainError> {
        let mut tables = self.lock();
        let rows = M::rows(&mut tables);
        let before = rows.len();
        rows.retain(|m| !m.header().status.is_pending());
        Ok((before - rows.len()) as u64)
    }
}

#[async_trait]
impl<E: HistoryTable + Send + Sync> HistoryStore<E> for InMemoryStore {
    async fn append(&self, event: &EventHistory) -> Result<(), DomainError> {
        E::rows(&mut self.lock()).push(event.clone());
        Ok(())
    }

    async fn list_for(&self, entity_id: Uuid) -> Result<Vec<EventHistory>, DomainError> {
        Ok(self.history::<E>(entity_id))
    }

    async fn delete_for(&self, entity_id: Uuid) -> Result<u64, DomainError> {
        let mut tables = self.lock();
        let rows = E::rows(&mut tables);
        let before = rows.len();
        rows.retain(|e| e.entity_id != entity_id);
        Ok((before - rows.len()) as u64)
    }
}

/// A store whose every operation fails with an infrastructure error.
#[derive(Debug, Clone, Copy)]
pub struct FailingStore;

fn unavailable<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("store unavailable".to_owned()))
}

#[async_trait]
impl ClientRepository for FailingStore {
    async fn get(&self, _id: Uuid) -> Result<Option<Client>, DomainError> {
        unavailable()
    }

    async fn insert(&self, _client: &Client) -> Result<(), DomainError> {
        unavailable()
    }

    async fn update(&self, _client: &Client) -> Result<(), DomainError> {
        unavailable()
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DomainError> {
        unavailable()
    }

    async fn list(&self) -> Result<Vec<Client>, DomainError> {
        unavailable()
    }
}

#[async_trait]
impl SubscriptionRepository for FailingStore {
    async fn get(&self, _id: Uuid) -> Result<Option<Subscription>, DomainError> {
        unavailable()
    }

    async fn insert(&self, _subscription: &Subscription) -> Result<(), DomainError> {
        unavailable()
    }

    async fn update(&self, _subscription: &Subscription) -> Result<(), DomainError> {
        unavailable()
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DomainError> {
        unavailable()
    }

    async fn list(&self) -> Result<Vec<Subscription>, DomainError> {
        unavailable()
    }

    async fn list_for_client(&self, _client_id: Uuid) -> Result<Vec<Subscription>, DomainError> {
        unavailable()
    }

    async fn has_for_client(&self, _client_id: Uuid) -> Result<bool, DomainError> {
        unavailable()
    }
}

#[async_trait]
impl<M: Message> MessageStore<M> for FailingStore {
    async fn insert(&self, _message: &M) -> Result<(), DomainError> {
        unavailable()
    }

    async fn get(&self, _id: Uuid) -> Result<Option<M>, DomainError> {
        unavailable()
    }

    async fn due(&self, _now: DateTime<Utc>) -> Result<Vec<M>, DomainError> {
        unavailable()
    }

    async fn claim_next(&self, _now: DateTime<Utc>) -> Result<Option<M>, DomainError> {
        unavailable()
    }

    async fn complete(
        &self,
        _id: Uuid,
        _status: MessageStatus,
        _processed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        unavailable()
    }

    async fn fail_outstanding(
        &self,
        _entity_id: Uuid,
        _keep: Uuid,
        _at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        unavailable()
    }

    async fn page(&self, _request: PageRequest) -> Result<Page<M>, DomainError> {
        unavailable()
    }

    async fn purge_pending(&self) -> Result<u64, DomainError> {
        unavailable()
    }
}

#[async_trait]
impl<E: Send + Sync> HistoryStore<E> for FailingStore {
    async fn append(&self, _event: &EventHistory) -> Result<(), DomainError> {
        unavailable()
    }

    async fn list_for(&self, _entity_id: Uuid) -> Result<Vec<EventHistory>, DomainError> {
        unavailable()
    }

    async fn delete_for(&self, _entity_id: Uuid) -> Result<u64, DomainError> {
        unavailable()
    }
}
