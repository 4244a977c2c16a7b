//! Query handlers for the Subscription context.

use serde::Serialize;
use subs_core::error::DomainError;
use subs_core::history::{EventHistory, EventHistoryLog};
use subs_core::message::{Message, SubscriptionMessage};
use subs_core::repository::{MessageStore, Page, PageRequest, SubscriptionRepository};
use subs_core::subscription::Subscription;
use tracing::info;
use uuid::Uuid;

/// Read-only view of one subscription.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    /// The subscription row.
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Amount after discount, in minor units.
    pub total_cents: i64,
    /// History of the subscription, oldest first.
    pub history: Vec<EventHistory>,
}

/// Retrieves a subscription with its history.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the subscription does not exist, or
/// any storage error.
pub async fn get_subscription_by_id(
    subscription_id: Uuid,
    subscriptions: &dyn SubscriptionRepository,
    history: &EventHistoryLog<Subscription>,
) -> Result<SubscriptionView, DomainError> {
    let subscription = subscriptions
        .get(subscription_id)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "subscription",
            id: subscription_id,
        })?;
    let history = history.for_entity(subscription_id).await?;

    Ok(SubscriptionView {
        total_cents: subscription.payment.total_cents(),
        subscription,
        history,
    })
}

/// Lists every subscription.
///
/// # Errors
///
/// Returns any storage error.
pub async fn list_subscriptions(
    subscriptions: &dyn SubscriptionRepository,
) -> Result<Vec<Subscription>, DomainError> {
    subscriptions.list().await
}

/// Lists the subscriptions of one client.
///
/// # Errors
///
/// Returns any storage error.
pub async fn list_subscriptions_for_client(
    client_id: Uuid,
    subscriptions: &dyn SubscriptionRepository,
) -> Result<Vec<Subscription>, DomainError> {
    subscriptions.list_for_client(client_id).await
}

/// One page of the subscription queue, newest first.
///
/// # Errors
///
/// Returns any storage error.
pub async fn list_subscription_messages(
    request: PageRequest,
    messages: &dyn MessageStore<SubscriptionMessage>,
) -> Result<Page<SubscriptionMessage>, DomainError> {
    messages.page(request).await
}

/// Deletes every `Received` or `Processing` subscription message.
///
/// # Errors
///
/// Returns any storage error.
pub async fn purge_subscription_messages(
    messages: &dyn MessageStore<SubscriptionMessage>,
) -> Result<u64, DomainError> {
    let purged = messages.purge_pending().await?;
    info!(queue = SubscriptionMessage::QUEUE, purged, "purged pending messages");
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use subs_core::status::{MessageStatus, Operation, Status};
    use subs_core::subscription::{
        Currency, Discount, DiscountKind, Payment, PaymentFrequency, PaymentMethod,
    };
    use subs_test_support::{FailingStore, FixedClock, InMemoryStore};

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn subscription(client_id: Uuid) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            client_id,
            product_id: Uuid::new_v4(),
            status: Status::Active,
            payment: Payment {
                method: PaymentMethod::Credit,
                frequency: PaymentFrequency::Semiannual,
                amount_cents: 20_000,
                discount: Discount {
                    kind: DiscountKind::Percentage,
                    value: 2_500,
                },
                currency: Currency::local(fixed_now()),
            },
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn test_get_subscription_by_id_includes_total_and_history() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let s = subscription(Uuid::new_v4());
        store.seed_subscription(s.clone());
        let log = EventHistoryLog::<Subscription>::new(
            store.clone(),
            Arc::new(FixedClock(fixed_now())),
        );
        log.add_event(s.id, Operation::Create, Status::Draft, "Subscription created as draft.", None)
            .await
            .unwrap();

        // Act
        let view = get_subscription_by_id(s.id, store.as_ref(), &log).await.unwrap();

        // Assert
        assert_eq!(view.subscription, s);
        assert_eq!(view.total_cents, 15_000);
        assert_eq!(view.history.len(), 1);
    }

    #[tokio::test]
    async fn test_list_subscriptions_for_client_filters_by_owner() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let mine = subscription(owner);
        store.seed_subscription(mine.clone());
        store.seed_subscription(subscription(Uuid::new_v4()));

        let all = list_subscriptions(&store).await.unwrap();
        let owned = list_subscriptions_for_client(owner, &store).await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(owned, vec![mine]);
    }

    #[tokio::test]
    async fn test_purge_subscription_messages_counts_deleted_rows() {
        let store = InMemoryStore::new();
        let pending = SubscriptionMessage::new(Uuid::new_v4(), Operation::Create);
        let mut done = SubscriptionMessage::new(Uuid::new_v4(), Operation::Create);
        done.header.status = MessageStatus::Failed;
        store.seed_message(pending);
        store.seed_message(done.clone());

        let purged = purge_subscription_messages(&store).await.unwrap();
        let page = list_subscription_messages(PageRequest::default(), &store)
            .await
            .unwrap();

        assert_eq!(purged, 1);
        assert_eq!(page.total, 1);
        assert_eq!(page.items, vec![done]);
    }

    #[tokio::test]
    async fn test_get_subscription_by_id_totals_full_discount_on_large_amount() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let mut s = subscription(Uuid::new_v4());
        s.payment.amount_cents = 1_000_000_000_000_000;
        s.payment.discount = Discount {
            kind: DiscountKind::Percentage,
            value: 10_000,
        };
        store.seed_subscription(s.clone());
        let log = EventHistoryLog::<Subscription>::new(
            store.clone(),
            Arc::new(FixedClock(fixed_now())),
        );

        // Act
        let view = get_subscription_by_id(s.id, store.as_ref(), &log).await.unwrap();

        // Assert
        assert_eq!(view.total_cents, 0);
    }

    #[tokio::test]
    async fn test_queue_listing_propagates_store_errors() {
        let result = list_subscription_messages(PageRequest::default(), &FailingStore).await;

        match result.unwrap_err() {
            DomainError::Infrastructure(_) => {}
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }
}
