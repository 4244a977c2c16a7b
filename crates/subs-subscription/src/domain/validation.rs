//! Field rules for subscription rows.

use chrono::{DateTime, Utc};
use subs_core::error::DomainError;
use subs_core::subscription::{DiscountKind, FULL_PERCENTAGE_BP, Payment, Subscription};

/// Every rule `subscription` breaks when checked at `now`.
#[must_use]
pub fn violations(subscription: &Subscription, now: DateTime<Utc>) -> Vec<String> {
    let mut found = Vec::new();

    if subscription.client_id.is_nil() {
        found.push("Client information is required.".to_owned());
    }
    if subscription.product_id.is_nil() {
        found.push("ProductId is required.".to_owned());
    }
    if subscription.created_at > now {
        found.push("CreatedAt cannot be in the future.".to_owned());
    }
    if subscription.updated_at < subscription.created_at {
        found.push("UpdatedAt cannot be earlier than CreatedAt.".to_owned());
    }

    payment_violations(&subscription.payment, &mut found);
    found
}

fn payment_violations(payment: &Payment, found: &mut Vec<String>) {
    if payment.amount_cents < 0 {
        found.push("Payment's amount must not be less than 0.".to_owned());
    }

    let discount = &payment.discount;
    if discount.value < 0 {
        found.push("Discount must be greater than or equal to 0.".to_owned());
    } else if discount.kind == DiscountKind::Percentage && discount.value > FULL_PERCENTAGE_BP {
        found.push("Percentage discount cannot exceed 100%.".to_owned());
    }

    if payment.currency.code.trim().is_empty() {
        found.push("Currency type must not be empty.".to_owned());
    }
    if payment.currency.rate.is_nan() || payment.currency.rate <= 0.0 {
        found.push("Currency rate must be greater than 0.".to_owned());
    }
}

/// Checks `subscription` against every rule.
///
/// # Errors
///
/// Returns `DomainError::Validation` listing every broken rule, joined with
/// `"; "`.
pub fn validate(subscription: &Subscription, now: DateTime<Utc>) -> Result<(), DomainError> {
    let found = violations(subscription, now);
    if found.is_empty() {
        Ok(())
    } else {
        Err(DomainError::from_violations(&found))
    }
}
