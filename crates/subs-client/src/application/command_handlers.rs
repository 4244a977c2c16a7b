//! Command handlers for the Client context.
//!
//! [`ClientService`] is the façade callers use to change clients. Each
//! handler validates, writes the provisional row, enqueues a command on the
//! client queue and records history. The worker applies the command later.

use std::sync::Arc;

use subs_core::bus::Bus;
use subs_core::client::Client;
use subs_core::command::Command;
use subs_core::error::DomainError;
use subs_core::history::EventHistoryLog;
use subs_core::message::ClientMessage;
use subs_core::repository::ClientRepository;
use subs_core::status::{Operation, Status};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::commands::{CreateClient, DeleteClient, UpdateClient};
use crate::domain::validation;

/// Façade over the `clients` table and the client queue.
#[derive(Clone)]
pub struct ClientService {
    clients: Arc<dyn ClientRepository>,
    bus: Arc<dyn Bus<ClientMessage>>,
    history: EventHistoryLog<Client>,
}

impl std::fmt::Debug for ClientService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientService").finish_non_exhaustive()
    }
}

impl ClientService {
    /// Creates the façade.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        bus: Arc<dyn Bus<ClientMessage>>,
        history: EventHistoryLog<Client>,
    ) -> Self {
        Self {
            clients,
            bus,
            history,
        }
    }

    /// Handles `CreateClient`: stores the client as `Draft`, enqueues a
    /// Create command and records the `Draft` and `Pending` events.
    ///
    /// Nothing written before a failure is undone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a field rule is broken, or any
    /// storage error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id))]
    pub async fn create(&self, command: &CreateClient) -> Result<Client, DomainError> {
        let client = Client {
            id: command
                .client_id
                .filter(|id| !id.is_nil())
                .unwrap_or_else(Uuid::new_v4),
            first_name: command.first_name.clone(),
            last_name: command.last_name.clone(),
            email: command.email.clone(),
            phone: command.phone.clone(),
            status: Status::Draft,
        };

        if let Err(e) = self.submit_new(&client).await {
            error!(client_id = %client.id, error = %e, "error while creating client");
            return Err(e);
        }

        info!(
            client_id = %client.id,
            command = command.command_type(),
            "client sent to creation queue"
        );
        Ok(client)
    }

    async fn submit_new(&self, client: &Client) -> Result<(), DomainError> {
        validation::validate(client)?;

        self.clients.insert(client).await?;
        self.history
            .add_event(
                client.id,
                Operation::Create,
                Status::Draft,
                "Client created as draft.",
                None,
            )
            .await?;

        self.bus
            .send(ClientMessage::new(client, Operation::Create)?)
            .await?;
        self.history
            .add_event(
                client.id,
                Operation::Create,
                Status::Pending,
                "Client sent to creation queue.",
                None,
            )
            .await?;
        Ok(())
    }

    /// Handles `UpdateClient`: replaces the contact fields, persists them and
    /// enqueues an Update command carrying the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the client does not exist,
    /// `DomainError::Validation` if a field rule is broken, or any storage
    /// error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, client_id = %command.client_id))]
    pub async fn update(&self, command: &UpdateClient) -> Result<Client, DomainError> {
        let mut client = self.load(command.client_id).await?;
        client.first_name.clone_from(&command.first_name);
        client.last_name.clone_from(&command.last_name);
        client.email.clone_from(&command.email);
        client.phone.clone_from(&command.phone);

        validation::validate(&client)?;

        self.clients.update(&client).await?;
        self.bus
            .send(ClientMessage::new(&client, Operation::Update)?)
            .await?;
        self.history
            .add_event(
                client.id,
                Operation::Update,
                client.status,
                "Client updated and sent to processing queue.",
                None,
            )
            .await?;

        info!(command = command.command_type(), "client sent to update queue");
        Ok(client)
    }

    /// Handles `DeleteClient`: enqueues a Delete command. The row stays until
    /// the worker removes it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the client does not exist, or any
    /// storage error.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id, client_id = %command.client_id))]
    pub async fn delete(&self, command: &DeleteClient) -> Result<(), DomainError> {
        let client = self.load(command.client_id).await?;

        self.bus
            .send(ClientMessage::new(&client, Operation::Delete)?)
            .await?;
        self.history
            .add_event(
                client.id,
                Operation::Delete,
                client.status,
                "Client deletion sent to processing queue.",
                None,
            )
            .await?;

        info!(command = command.command_type(), "client sent to delete queue");
        Ok(())
    }

    async fn load(&self, client_id: Uuid) -> Result<Client, DomainError> {
        self.clients
            .get(client_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "client",
                id: client_id,
            })
    }
}
