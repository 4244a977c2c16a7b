//! Row shapes returned by the queries in [`crate::pg_store`].

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use subs_core::client::Client;
use subs_core::error::DomainError;
use subs_core::history::EventHistory;
use subs_core::message::MessageHeader;
use subs_core::subscription::{Payment, Subscription};
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub(crate) struct ClientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    status: String,
}

impl TryFrom<ClientRow> for Client {
    type Error = DomainError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            status: row.status.parse()?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SubscriptionRow {
    id: Uuid,
    client_id: Uuid,
    product_id: Uuid,
    status: String,
    payment: Json<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            product_id: row.product_id,
            status: row.status.parse()?,
            payment: row.payment.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A queue row with the entity column aliased to `entity_id` and the optional
/// snapshot column aliased to `payload`.
#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    id: Uuid,
    pub(crate) entity_id: Uuid,
    pub(crate) payload: Option<String>,
    operation: String,
    created_at: DateTime<Utc>,
    status: String,
    callback_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    pub(crate) fn header(&self) -> Result<MessageHeader, DomainError> {
        Ok(MessageHeader {
            id: self.id,
            operation: self.operation.parse()?,
            created_at: self.created_at,
            status: self.status.parse()?,
            callback_at: self.callback_at,
            processed_at: self.processed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct HistoryRow {
    id: Uuid,
    entity_id: Uuid,
    rollback_id: Uuid,
    created_at: DateTime<Utc>,
    operation: String,
    status_at_event: String,
    note: String,
}

impl TryFrom<HistoryRow> for EventHistory {
    type Error = DomainError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            entity_id: row.entity_id,
            rollback_id: row.rollback_id,
            created_at: row.created_at,
            operation: row.operation.parse()?,
            status_at_event: row.status_at_event.parse()?,
            note: row.note,
        })
    }
}
