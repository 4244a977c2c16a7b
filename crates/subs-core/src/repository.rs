//! Storage ports.
//!
//! Each table the pipeline touches is reached through one of these traits.
//! `subs-store` implements them on PostgreSQL; `subs-test-support` provides
//! in-memory and failing doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::client::Client;
use crate::error::DomainError;
use crate::history::EventHistory;
use crate::message::Message;
use crate::status::MessageStatus;
use crate::subscription::Subscription;

/// Access to the `clients` table.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Loads a client by id.
    async fn get(&self, id: Uuid) -> Result<Option<Client>, DomainError>;

    /// Inserts a new client row.
    async fn insert(&self, client: &Client) -> Result<(), DomainError>;

    /// Overwrites every column of an existing client row.
    async fn update(&self, client: &Client) -> Result<(), DomainError>;

    /// Deletes a client row. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Lists every client.
    async fn list(&self) -> Result<Vec<Client>, DomainError>;
}

/// Access to the `subscriptions` table.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Loads a subscription by id.
    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, DomainError>;

    /// Inserts a new subscription row.
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Overwrites every column of an existing subscription row.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Deletes a subscription row together with its history. Returns whether
    /// a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Lists every subscription.
    async fn list(&self) -> Result<Vec<Subscription>, DomainError>;

    /// Lists the subscriptions referencing a client.
    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Subscription>, DomainError>;

    /// Whether any subscription references a client.
    async fn has_for_client(&self, client_id: Uuid) -> Result<bool, DomainError>;
}

/// A queue table holding messages of type `M`.
#[async_trait]
pub trait MessageStore<M: Message>: Send + Sync {
    /// Persists a sent message in a single write.
    async fn insert(&self, message: &M) -> Result<(), DomainError>;

    /// Loads a message by id.
    async fn get(&self, id: Uuid) -> Result<Option<M>, DomainError>;

    /// Every `Received` message whose `callback_at` is at or before `now`,
    /// ordered by ascending `callback_at`.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<M>, DomainError>;

    /// Atomically takes the earliest due message, marking it `Processed` with
    /// `processed_at = now`.
    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<M>, DomainError>;

    /// Moves a non-terminal message to `status`. Returns `false` when the
    /// message is missing or already terminal.
    async fn complete(
        &self,
        id: Uuid,
        status: MessageStatus,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Marks every non-terminal message of `entity_id` except `keep` as
    /// `Failed`. Returns the number of rows touched.
    async fn fail_outstanding(
        &self,
        entity_id: Uuid,
        keep: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError>;

    /// One page of messages, newest first.
    async fn page(&self, request: PageRequest) -> Result<Page<M>, DomainError>;

    /// Deletes every `Received` or `Processing` message. Returns the count.
    async fn purge_pending(&self) -> Result<u64, DomainError>;
}

/// The history table of entity type `E`.
#[async_trait]
pub trait HistoryStore<E>: Send + Sync {
    /// Appends one record.
    async fn append(&self, event: &EventHistory) -> Result<(), DomainError>;

    /// Records of one entity, oldest first.
    async fn list_for(&self, entity_id: Uuid) -> Result<Vec<EventHistory>, DomainError>;

    /// Removes every record of one entity. Returns the count.
    async fn delete_for(&self, entity_id: Uuid) -> Result<u64, DomainError>;
}

/// Default page number.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest page size honoured.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Builds a request; page numbers below 1 become 1 and the size is
    /// clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Slices an already-ordered collection.
    #[must_use]
    pub fn slice<T: Clone>(&self, ordered: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let items = ordered
            .iter()
            .skip(start)
            .take(self.page_size as usize)
            .cloned()
            .collect();
        Page {
            total: ordered.len() as u64,
            page: self.page,
            page_size: self.page_size,
            items,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

/// A page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Total rows across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Rows on this page.
    pub items: Vec<T>,
}
