//! Queued command messages.
//!
//! Every message shares a [`MessageHeader`]; the two concrete message types
//! add the reference to the entity they target. Client messages also carry a
//! JSON snapshot of the client taken at enqueue time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::client::Client;
use crate::error::DomainError;
use crate::status::{MessageStatus, Operation};

/// Fields common to every queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    /// Unique message identifier.
    pub id: Uuid,
    /// Command to apply.
    pub operation: Operation,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
    /// Delivery status.
    pub status: MessageStatus,
    /// Earliest time a consumer may see the message.
    pub callback_at: DateTime<Utc>,
    /// When the message reached a terminal status.
    pub processed_at: Option<DateTime<Utc>>,
}

impl MessageHeader {
    /// A fresh, unsent header. The bus stamps the timestamps on send.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            status: MessageStatus::Received,
            callback_at: DateTime::<Utc>::UNIX_EPOCH,
            processed_at: None,
        }
    }

    /// Whether a consumer polling at `now` may take this message.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == MessageStatus::Received && self.callback_at <= now
    }

    /// Moves the message to a terminal status. Returns `false` and leaves the
    /// header untouched when it is already terminal.
    pub fn finish(&mut self, status: MessageStatus, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.processed_at = Some(at);
        true
    }
}

/// Base trait for everything that travels over a [`Bus`](crate::bus::Bus).
pub trait Message: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Queue name used in logs.
    const QUEUE: &'static str;

    /// Shared header.
    fn header(&self) -> &MessageHeader;

    /// Mutable shared header.
    fn header_mut(&mut self) -> &mut MessageHeader;

    /// Identifier of the entity the command targets.
    fn entity_id(&self) -> Uuid;

    /// Visibility time requested by the producer, if this queue honours one.
    fn requested_callback_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Message identifier.
    fn id(&self) -> Uuid {
        self.header().id
    }

    /// Command carried by the message.
    fn operation(&self) -> Operation {
        self.header().operation
    }
}

/// A command against a client, with the client as it was when enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMessage {
    /// Shared header.
    #[serde(flatten)]
    pub header: MessageHeader,
    /// Target client.
    pub client_id: Uuid,
    /// JSON snapshot of the client at enqueue time.
    pub client_json: String,
}

impl ClientMessage {
    /// Builds a message carrying a snapshot of `client`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the snapshot cannot be encoded.
    pub fn new(client: &Client, operation: Operation) -> Result<Self, DomainError> {
        Ok(Self {
            header: MessageHeader::new(operation),
            client_id: client.id,
            client_json: serde_json::to_string(client)?,
        })
    }

    /// Decodes the snapshot captured at enqueue time.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the stored JSON is not a client.
    pub fn snapshot(&self) -> Result<Client, DomainError> {
        Ok(serde_json::from_str(&self.client_json)?)
    }
}

impl Message for ClientMessage {
    const QUEUE: &'static str = "client";

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }

    fn entity_id(&self) -> Uuid {
        self.client_id
    }
}

/// A command against a subscription. The worker re-reads the live row, so no
/// snapshot is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionMessage {
    /// Shared header.
    #[serde(flatten)]
    pub header: MessageHeader,
    /// Target subscription.
    pub subscription_id: Uuid,
    /// Visibility requested by the producer; not persisted.
    #[serde(skip)]
    pub requested_at: Option<DateTime<Utc>>,
}

impl SubscriptionMessage {
    /// Builds a message delivered after the bus's default jitter.
    #[must_use]
    pub fn new(subscription_id: Uuid, operation: Operation) -> Self {
        Self {
            header: MessageHeader::new(operation),
            subscription_id,
            requested_at: None,
        }
    }

    /// Requests a specific visibility time. Times before the send instant are
    /// clamped to it, so `deliver_at(now)` means "immediately".
    #[must_use]
    pub fn deliver_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = Some(at);
        self
    }
}

impl Message for SubscriptionMessage {
    const QUEUE: &'static str = "subscription";

    fn header(&self) -> &MessageHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MessageHeader {
        &mut self.header
    }

    fn entity_id(&self) -> Uuid {
        self.subscription_id
    }

    fn requested_callback_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at
    }
}
