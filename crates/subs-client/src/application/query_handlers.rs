//! Query handlers for the Client context.
//!
//! Read-only views over the `clients` table, its history and the client
//! queue, plus the operator purge of pending client messages.

use serde::Serialize;
use subs_core::client::Client;
use subs_core::error::DomainError;
use subs_core::history::{EventHistory, EventHistoryLog};
use subs_core::message::{ClientMessage, Message};
use subs_core::repository::{
    ClientRepository, MessageStore, Page, PageRequest, SubscriptionRepository,
};
use tracing::info;
use uuid::Uuid;

/// Read-only view of one client.
#[derive(Debug, Serialize)]
pub struct ClientView {
    /// The client row.
    #[serde(flatten)]
    pub client: Client,
    /// Ids of the subscriptions referencing the client.
    pub subscription_ids: Vec<Uuid>,
    /// History of the client, oldest first.
    pub history: Vec<EventHistory>,
}

/// Retrieves a client with its history and owned subscription ids.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the client does not exist, or any
/// storage error.
pub async fn get_client_by_id(
    client_id: Uuid,
    clients: &dyn ClientRepository,
    subscriptions: &dyn SubscriptionRepository,
    history: &EventHistoryLog<Client>,
) -> Result<ClientView, DomainError> {
    let client = clients
        .get(client_id)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "client",
            id: client_id,
        })?;
    let subscription_ids = subscriptions
        .list_for_client(client_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    let history = history.for_entity(client_id).await?;

    Ok(ClientView {
        client,
        subscription_ids,
        history,
    })
}

/// Lists every client.
///
/// # Errors
///
/// Returns any storage error.
pub async fn list_clients(clients: &dyn ClientRepository) -> Result<Vec<Client>, DomainError> {
    clients.list().await
}

/// One page of the client queue, newest first.
///
/// # Errors
///
/// Returns any storage error.
pub async fn list_client_messages(
    request: PageRequest,
    messages: &dyn MessageStore<ClientMessage>,
) -> Result<Page<ClientMessage>, DomainError> {
    messages.page(request).await
}

/// Deletes every `Received` or `Processing` client message.
///
/// # Errors
///
/// Returns any storage error.
pub async fn purge_client_messages(
    messages: &dyn MessageStore<ClientMessage>,
) -> Result<u64, DomainError> {
    let purged = messages.purge_pending().await?;
    info!(queue = ClientMessage::QUEUE, purged, "purged pending messages");
    Ok(purged)
}
