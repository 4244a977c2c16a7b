//! PostgreSQL implementation of the storage ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use subs_core::client::Client;
use subs_core::error::DomainError;
use subs_core::history::EventHistory;
use subs_core::message::{ClientMessage, Message, MessageHeader, SubscriptionMessage};
use subs_core::repository::{
    ClientRepository, HistoryStore, MessageStore, Page, PageRequest, SubscriptionRepository,
};
use subs_core::status::MessageStatus;
use subs_core::subscription::Subscription;
use tracing::debug;
use uuid::Uuid;

use crate::rows::{ClientRow, HistoryRow, MessageRow, SubscriptionRow};

const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, status";

const SUBSCRIPTION_COLUMNS: &str =
    "id, client_id, product_id, status, payment, created_at, updated_at";

/// Statuses a message may still leave.
const OPEN_STATUSES: &str = "('Received', 'Processing')";

fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Table layout of one message queue.
pub trait PgQueue: Message {
    /// Queue table name.
    const TABLE: &'static str;
    /// Column referencing the target entity.
    const ENTITY_COLUMN: &'static str;
    /// Column holding the enqueue-time snapshot, if the queue keeps one.
    const PAYLOAD_COLUMN: Option<&'static str>;

    /// The snapshot to persist in [`Self::PAYLOAD_COLUMN`].
    fn payload(&self) -> Option<&str>;

    /// Rebuilds a message from a stored row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the row cannot be decoded.
    fn from_parts(
        header: MessageHeader,
        entity_id: Uuid,
        payload: Option<String>,
    ) -> Result<Self, DomainError>;
}

impl PgQueue for ClientMessage {
    const TABLE: &'static str = "client_messages";
    const ENTITY_COLUMN: &'static str = "client_id";
    const PAYLOAD_COLUMN: Option<&'static str> = Some("client_json");

    fn payload(&self) -> Option<&str> {
        Some(&self.client_json)
    }

    fn from_parts(
        header: MessageHeader,
        entity_id: Uuid,
        payload: Option<String>,
    ) -> Result<Self, DomainError> {
        let client_json = payload.ok_or_else(|| {
            DomainError::Serialization(format!("client message {} has no snapshot", header.id))
        })?;
        Ok(Self {
            header,
            client_id: entity_id,
            client_json,
        })
    }
}

impl PgQueue for SubscriptionMessage {
    const TABLE: &'static str = "subscription_messages";
    const ENTITY_COLUMN: &'static str = "subscription_id";
    const PAYLOAD_COLUMN: Option<&'static str> = None;

    fn payload(&self) -> Option<&str> {
        None
    }

    fn from_parts(
        header: MessageHeader,
        entity_id: Uuid,
        _payload: Option<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            header,
            subscription_id: entity_id,
            requested_at: None,
        })
    }
}

fn message_columns<M: PgQueue>() -> String {
    format!(
        "id, {} AS entity_id, {} AS payload, operation, created_at, status, callback_at, processed_at",
        M::ENTITY_COLUMN,
        M::PAYLOAD_COLUMN.unwrap_or("NULL::TEXT"),
    )
}

fn decode<M: PgQueue>(row: MessageRow) -> Result<M, DomainError> {
    let header = row.header()?;
    M::from_parts(header, row.entity_id, row.payload)
}

/// Table layout of one history log.
pub trait PgHistory {
    /// History table name.
    const TABLE: &'static str;
    /// Column referencing the entity.
    const ENTITY_COLUMN: &'static str;
}

impl PgHistory for Client {
    const TABLE: &'static str = "client_event_history";
    const ENTITY_COLUMN: &'static str = "client_id";
}

impl PgHistory for Subscription {
    const TABLE: &'static str = "subscription_event_history";
    const ENTITY_COLUMN: &'static str = "subscription_id";
}

/// Every storage port over one PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore` backed by the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ClientRepository for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Client>, DomainError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(Client::try_from)
            .transpose()
    }

    async fn insert(&self, client: &Client) -> Result<(), DomainError> {
        sqlx::query(
            r"INSERT INTO clients (id, first_name, last_name, email, phone, status)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(client.id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn update(&self, client: &Client) -> Result<(), DomainError> {
        sqlx::query(
            r"UPDATE clients
              SET first_name = $2, last_name = $3, email = $4, phone = $5, status = $6
              WHERE id = $1",
        )
        .bind(client.id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<Client>, DomainError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY last_name, first_name");
        sqlx::query_as::<_, ClientRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(Client::try_from)
            .collect()
    }
}

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn get(&self, id: Uuid) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1");
        sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(Subscription::try_from)
            .transpose()
    }

    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r"INSERT INTO subscriptions
                (id, client_id, product_id, status, payment, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(subscription.id)
        .bind(subscription.client_id)
        .bind(subscription.product_id)
        .bind(subscription.status.as_str())
        .bind(Json(&subscription.payment))
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r"UPDATE subscriptions
              SET client_id = $2, product_id = $3, status = $4, payment = $5,
                  created_at = $6, updated_at = $7
              WHERE id = $1",
        )
        .bind(subscription.id)
        .bind(subscription.client_id)
        .bind(subscription.product_id)
        .bind(subscription.status.as_str())
        .bind(Json(&subscription.payment))
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        // subscription_event_history rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY created_at");
        sqlx::query_as::<_, SubscriptionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(Subscription::try_from)
            .collect()
    }

    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE client_id = $1 ORDER BY created_at"
        );
        sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(Subscription::try_from)
            .collect()
    }

    async fn has_for_client(&self, client_id: Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE client_id = $1)",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(infra)
    }
}

#[async_trait]
impl<M: PgQueue> MessageStore<M> for PgStore {
    async fn insert(&self, message: &M) -> Result<(), DomainError> {
        let header = message.header();
        let sql = match M::PAYLOAD_COLUMN {
            Some(payload) => format!(
                "INSERT INTO {} (id, {}, operation, created_at, status, callback_at, processed_at, {payload})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                M::TABLE,
                M::ENTITY_COLUMN,
            ),
            None => format!(
                "INSERT INTO {} (id, {}, operation, created_at, status, callback_at, processed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                M::TABLE,
                M::ENTITY_COLUMN,
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(header.id)
            .bind(message.entity_id())
            .bind(header.operation.as_str())
            .bind(header.created_at)
            .bind(header.status.as_str())
            .bind(header.callback_at)
            .bind(header.processed_at);
        if M::PAYLOAD_COLUMN.is_some() {
            query = query.bind(message.payload());
        }
        query.execute(&self.pool).await.map_err(infra)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<M>, DomainError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", message_columns::<M>(), M::TABLE);
        sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(decode)
            .transpose()
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<M>, DomainError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE status = 'Received' AND callback_at <= $1 ORDER BY callback_at",
            message_columns::<M>(),
            M::TABLE,
        );
        sqlx::query_as::<_, MessageRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<M>, DomainError> {
        let sql = format!(
            r"UPDATE {table} SET status = 'Processed', processed_at = $1
              WHERE id = (
                  SELECT id FROM {table}
                  WHERE status = 'Received' AND callback_at <= $1
                  ORDER BY callback_at
                  LIMIT 1
                  FOR UPDATE SKIP LOCKED
              )
              RETURNING {columns}",
            table = M::TABLE,
            columns = message_columns::<M>(),
        );
        let claimed = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?
            .map(decode::<M>)
            .transpose()?;

        if let Some(message) = &claimed {
            debug!(queue = M::QUEUE, message_id = %message.id(), "claimed message");
        }
        Ok(claimed)
    }

    async fn complete(
        &self,
        id: Uuid,
        status: MessageStatus,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let sql = format!(
            "UPDATE {} SET status = $2, processed_at = $3 WHERE id = $1 AND status IN {OPEN_STATUSES}",
            M::TABLE,
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(processed_at)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected() == 1)
    }

    async fn fail_outstanding(
        &self,
        entity_id: Uuid,
        keep: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let sql = format!(
            "UPDATE {} SET status = 'Failed', processed_at = $3
             WHERE {} = $1 AND id <> $2 AND status IN {OPEN_STATUSES}",
            M::TABLE,
            M::ENTITY_COLUMN,
        );
        let result = sqlx::query(&sql)
            .bind(entity_id)
            .bind(keep)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected())
    }

    async fn page(&self, request: PageRequest) -> Result<Page<M>, DomainError> {
        let total_sql = format!("SELECT COUNT(*) FROM {}", M::TABLE);
        let total = sqlx::query_scalar::<_, i64>(&total_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(infra)?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            message_columns::<M>(),
            M::TABLE,
        );
        let items = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(i64::from(request.page_size()))
            .bind(i64::try_from(request.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<M>, _>>()?;

        Ok(Page {
            total: count(total),
            page: request.page(),
            page_size: request.page_size(),
            items,
        })
    }

    async fn purge_pending(&self) -> Result<u64, DomainError> {
        let sql = format!("DELETE FROM {} WHERE status IN {OPEN_STATUSES}", M::TABLE);
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl<E: PgHistory + Send + Sync> HistoryStore<E> for PgStore {
    async fn append(&self, event: &EventHistory) -> Result<(), DomainError> {
        let sql = format!(
            "INSERT INTO {} (id, {}, rollback_id, created_at, operation, status_at_event, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            E::TABLE,
            E::ENTITY_COLUMN,
        );
        sqlx::query(&sql)
            .bind(event.id)
            .bind(event.entity_id)
            .bind(event.rollback_id)
            .bind(event.created_at)
            .bind(event.operation.as_str())
            .bind(event.status_at_event.as_str())
            .bind(&event.note)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(())
    }

    async fn list_for(&self, entity_id: Uuid) -> Result<Vec<EventHistory>, DomainError> {
        let sql = format!(
            "SELECT id, {entity} AS entity_id, rollback_id, created_at, operation, status_at_event, note
             FROM {table} WHERE {entity} = $1 ORDER BY seq",
            table = E::TABLE,
            entity = E::ENTITY_COLUMN,
        );
        sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?
            .into_iter()
            .map(EventHistory::try_from)
            .collect()
    }

    async fn delete_for(&self, entity_id: Uuid) -> Result<u64, DomainError> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", E::TABLE, E::ENTITY_COLUMN);
        let result = sqlx::query(&sql)
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected())
    }
}
