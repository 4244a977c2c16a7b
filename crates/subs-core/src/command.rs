//! Façade commands: the inputs to the client and subscription services.

use uuid::Uuid;

/// Trait implemented by every façade command.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted command name used in logs, e.g. `"client.create"`.
    fn command_type(&self) -> &'static str;

    /// Correlation ID carried through logs for one request.
    fn correlation_id(&self) -> Uuid;
}
