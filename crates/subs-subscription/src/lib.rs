//! Subs: Subscription lifecycle context.
//!
//! Submits subscription commands to the subscription queue and reconciles
//! them against the `subscriptions` table. A subscription can only be
//! created for an active client.

pub mod application;
pub mod domain;
