//! Append-only event history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::error::DomainError;
use crate::repository::HistoryStore;
use crate::status::{Operation, Status};

/// One immutable status-transition record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventHistory {
    /// Unique record identifier.
    pub id: Uuid,
    /// The entity this record belongs to.
    pub entity_id: Uuid,
    /// The event being undone, or nil when this is not a rollback.
    pub rollback_id: Uuid,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
    /// Operation that caused the transition.
    pub operation: Operation,
    /// Entity status recorded with the event.
    pub status_at_event: Status,
    /// Free-text note.
    pub note: String,
}

impl EventHistory {
    /// Whether this record undoes another one.
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        !self.rollback_id.is_nil()
    }
}

/// Writer and reader for the history of entity type `E`.
pub struct EventHistoryLog<E> {
    store: Arc<dyn HistoryStore<E>>,
    clock: SharedClock,
}

impl<E> Clone for EventHistoryLog<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<E> std::fmt::Debug for EventHistoryLog<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHistoryLog").finish_non_exhaustive()
    }
}

impl<E> EventHistoryLog<E> {
    /// Creates a log over `store`, stamping records with `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore<E>>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Appends one record. A `None` rollback id stores the nil sentinel.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the record cannot be persisted.
    pub async fn add_event(
        &self,
        entity_id: Uuid,
        operation: Operation,
        status_at_event: Status,
        note: impl Into<String>,
        rollback_id: Option<Uuid>,
    ) -> Result<EventHistory, DomainError> {
        let event = EventHistory {
            id: Uuid::new_v4(),
            entity_id,
            rollback_id: rollback_id.unwrap_or(Uuid::nil()),
            created_at: self.clock.now(),
            operation,
            status_at_event,
            note: note.into(),
        };

        debug!(
            entity_id = %entity_id,
            operation = %operation,
            status = %status_at_event,
            "appending history event"
        );
        self.store.append(&event).await?;
        Ok(event)
    }

    /// History of one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the records cannot be loaded.
    pub async fn for_entity(&self, entity_id: Uuid) -> Result<Vec<EventHistory>, DomainError> {
        self.store.list_for(entity_id).await
    }

    /// Removes the history of one entity. Used only when the entity itself is
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the records cannot be deleted.
    pub async fn purge(&self, entity_id: Uuid) -> Result<u64, DomainError> {
        self.store.delete_for(entity_id).await
    }
}
