//! The client row.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::Status;

/// A client of the subscription system.
///
/// Subscriptions reference clients by id; a client never embeds its
/// subscriptions. Ownership is resolved through
/// [`SubscriptionRepository::has_for_client`](crate::repository::SubscriptionRepository::has_for_client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub id: Uuid,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Phone number, digits with an optional leading `+`.
    pub phone: String,
    /// Current lifecycle status.
    pub status: Status,
}

impl Client {
    /// Copies the contact fields (names, email, phone) from `other`, leaving
    /// id and status untouched.
    pub fn apply_contact(&mut self, other: &Client) {
        self.first_name.clone_from(&other.first_name);
        self.last_name.clone_from(&other.last_name);
        self.email.clone_from(&other.email);
        self.phone.clone_from(&other.phone);
    }

    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
