//! Commands for the Client context.

use subs_core::command::Command;
use uuid::Uuid;

/// Command to register a new client.
#[derive(Debug, Clone)]
pub struct CreateClient {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Caller-chosen id. A fresh one is assigned when absent or nil.
    pub client_id: Option<Uuid>,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
}

impl Command for CreateClient {
    fn command_type(&self) -> &'static str {
        "client.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to replace the contact details of a client.
#[derive(Debug, Clone)]
pub struct UpdateClient {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The client to update.
    pub client_id: Uuid,
    /// New first name.
    pub first_name: String,
    /// New last name.
    pub last_name: String,
    /// New email address.
    pub email: String,
    /// New phone number.
    pub phone: String,
}

impl Command for UpdateClient {
    fn command_type(&self) -> &'static str {
        "client.update"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to request removal of a client.
#[derive(Debug, Clone)]
pub struct DeleteClient {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The client to delete.
    pub client_id: Uuid,
}

impl Command for DeleteClient {
    fn command_type(&self) -> &'static str {
        "client.delete"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
