//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity row was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"client"`.
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// One or more validation rules were violated. The message joins every
    /// violation with `"; "`.
    #[error("validation error: {0}")]
    Validation(String),

    /// A payload or persisted value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Builds a validation error from a list of rule violations.
    #[must_use]
    pub fn from_violations(violations: &[String]) -> Self {
        Self::Validation(violations.join("; "))
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
