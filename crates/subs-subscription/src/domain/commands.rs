//! Commands for the Subscription context.

use chrono::{DateTime, Utc};
use subs_core::command::Command;
use subs_core::status::Status;
use subs_core::subscription::{Currency, Discount, Payment, PaymentFrequency, PaymentMethod};
use uuid::Uuid;

/// Payment terms as supplied by a caller. Missing parts get defaults.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// Payment method.
    pub method: PaymentMethod,
    /// Charge frequency.
    pub frequency: PaymentFrequency,
    /// Amount before discount, in minor units.
    pub amount_cents: i64,
    /// Discount; a zero percentage discount when absent.
    pub discount: Option<Discount>,
    /// Currency; the local currency at rate 1.0 when absent.
    pub currency: Option<Currency>,
}

impl PaymentInput {
    /// Resolves the defaults, referencing a defaulted currency at `now`.
    #[must_use]
    pub fn into_payment(self, now: DateTime<Utc>) -> Payment {
        Payment {
            method: self.method,
            frequency: self.frequency,
            amount_cents: self.amount_cents,
            discount: self.discount.unwrap_or_else(Discount::zero),
            currency: self.currency.unwrap_or_else(|| Currency::local(now)),
        }
    }
}

/// Command to subscribe a client to a product.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subscribing client. Must exist and be active.
    pub client_id: Uuid,
    /// The product subscribed to.
    pub product_id: Uuid,
    /// Payment terms.
    pub payment: PaymentInput,
    /// Creation time; now when absent.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time; now when absent.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Command for CreateSubscription {
    fn command_type(&self) -> &'static str {
        "subscription.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to replace the status, product and payment of a subscription.
#[derive(Debug, Clone)]
pub struct UpdateSubscription {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subscription to update.
    pub subscription_id: Uuid,
    /// New status.
    pub status: Status,
    /// New product.
    pub product_id: Uuid,
    /// New payment terms.
    pub payment: Payment,
}

impl Command for UpdateSubscription {
    fn command_type(&self) -> &'static str {
        "subscription.update"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to change only the status of a subscription.
#[derive(Debug, Clone)]
pub struct UpdateSubscriptionStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subscription to update.
    pub subscription_id: Uuid,
    /// New status.
    pub status: Status,
    /// When the worker should see the change; the bus delay applies when
    /// absent.
    pub effective_at: Option<DateTime<Utc>>,
}

impl Command for UpdateSubscriptionStatus {
    fn command_type(&self) -> &'static str {
        "subscription.update_status"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to request removal of a subscription.
#[derive(Debug, Clone)]
pub struct DeleteSubscription {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subscription to delete.
    pub subscription_id: Uuid,
}

impl Command for DeleteSubscription {
    fn command_type(&self) -> &'static str {
        "subscription.delete"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
