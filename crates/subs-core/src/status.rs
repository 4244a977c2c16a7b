//! Enumerations shared by entities, messages and history records.
//!
//! All of them persist as their variant name (`"Active"`, `"Received"`, ...).

persisted_enum! {
    /// Lifecycle status shared by clients and subscriptions.
    ///
    /// `Draft → Pending → Active → {Suspended ↔ Active, Canceled, Expired}`.
    /// Nothing in the pipeline produces `Expired` yet.
    #[derive(Default)]
    pub enum Status {
        /// Created but not yet submitted.
        #[default]
        Draft,
        /// Submitted and waiting for the worker to activate it.
        Pending,
        /// Active and valid.
        Active,
        /// Terminated on request.
        Canceled,
        /// Ended after its term.
        Expired,
        /// Temporarily disabled; may be reactivated.
        Suspended,
    }
}

persisted_enum! {
    /// Command carried by a queued message and recorded in history.
    pub enum Operation {
        /// Create the entity.
        Create,
        /// Update the entity.
        Update,
        /// Delete the entity.
        Delete,
        /// Undo a previous transition.
        Rollback,
    }
}

persisted_enum! {
    /// Delivery status of a queued message.
    #[derive(Default)]
    pub enum MessageStatus {
        /// Stored and waiting for its visibility time.
        #[default]
        Received,
        /// Claimed by a consumer.
        Processing,
        /// Applied successfully. Terminal.
        Processed,
        /// Rejected. Terminal, never retried.
        Failed,
    }
}

impl MessageStatus {
    /// Whether no further transition is allowed from this status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }

    /// Whether an operator purge may delete a message in this status.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Received | Self::Processing)
    }
}

impl Status {
    /// Whether the worker may promote an entity in this status to `Active`
    /// on a Create command.
    #[must_use]
    pub fn can_activate(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }
}
