//! Integration tests for `PgStore`.
//!
//! These need a PostgreSQL server reachable through `DATABASE_URL`; run them
//! with `cargo test -p subs-store -- --ignored`.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use sqlx::PgPool;
use subs_core::client::Client;
use subs_core::history::EventHistory;
use subs_core::message::{ClientMessage, Message, SubscriptionMessage};
use subs_core::repository::{
    ClientRepository, HistoryStore, MessageStore, PageRequest, SubscriptionRepository,
};
use subs_core::status::{MessageStatus, Operation, Status};
use subs_core::subscription::{
    Currency, Discount, DiscountKind, Payment, PaymentFrequency, PaymentMethod, Subscription,
};
use subs_store::pg_store::PgStore;
use uuid::Uuid;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

fn make_client(status: Status) -> Client {
    Client {
        id: Uuid::new_v4(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: "test@user.com".to_string(),
        phone: "5512991232566".to_string(),
        status,
    }
}

fn make_subscription(client_id: Uuid) -> Subscription {
    Subscription {
        id: Uuid::new_v4(),
        client_id,
        product_id: Uuid::new_v4(),
        status: Status::Draft,
        payment: Payment {
            method: PaymentMethod::Pix,
            frequency: PaymentFrequency::Monthly,
            amount_cents: 4_990,
            discount: Discount {
                kind: DiscountKind::Percentage,
                value: 1_000,
            },
            currency: Currency::local(fixed_now()),
        },
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

/// A sent subscription message visible from `callback_at`.
fn subscription_message(
    subscription_id: Uuid,
    callback_at: DateTime<Utc>,
) -> SubscriptionMessage {
    let mut message = SubscriptionMessage::new(subscription_id, Operation::Create);
    message.header.created_at = fixed_now();
    message.header.callback_at = callback_at;
    message
}

fn history(entity_id: Uuid, at: DateTime<Utc>, note: &str) -> EventHistory {
    EventHistory {
        id: Uuid::new_v4(),
        entity_id,
        rollback_id: Uuid::nil(),
        created_at: at,
        operation: Operation::Create,
        status_at_event: Status::Draft,
        note: note.to_string(),
    }
}

// --- clients ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_client_insert_update_and_delete(pool: PgPool) {
    let store = PgStore::new(pool);
    let mut client = make_client(Status::Draft);

    ClientRepository::insert(&store, &client).await.unwrap();
    client.status = Status::Active;
    client.email = "changed@user.com".to_string();
    ClientRepository::update(&store, &client).await.unwrap();

    let loaded = ClientRepository::get(&store, client.id).await.unwrap();
    assert_eq!(loaded, Some(client.clone()));

    assert!(ClientRepository::delete(&store, client.id).await.unwrap());
    assert!(!ClientRepository::delete(&store, client.id).await.unwrap());
    assert!(ClientRepository::get(&store, client.id).await.unwrap().is_none());
}

// --- subscriptions ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_subscription_payment_survives_storage(pool: PgPool) {
    let store = PgStore::new(pool);
    let subscription = make_subscription(Uuid::new_v4());

    SubscriptionRepository::insert(&store, &subscription).await.unwrap();

    let loaded = SubscriptionRepository::get(&store, subscription.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, subscription);
    assert_eq!(loaded.payment.total_cents(), 4_491);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_has_for_client_and_list_for_client(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = Uuid::new_v4();
    let owned = make_subscription(owner);
    SubscriptionRepository::insert(&store, &owned).await.unwrap();
    SubscriptionRepository::insert(&store, &make_subscription(Uuid::new_v4()))
        .await
        .unwrap();

    assert!(store.has_for_client(owner).await.unwrap());
    assert!(!store.has_for_client(Uuid::new_v4()).await.unwrap());
    assert_eq!(store.list_for_client(owner).await.unwrap(), vec![owned]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_subscription_delete_cascades_history(pool: PgPool) {
    let store = PgStore::new(pool);
    let subscription = make_subscription(Uuid::new_v4());
    SubscriptionRepository::insert(&store, &subscription).await.unwrap();
    HistoryStore::<Subscription>::append(&store, &history(subscription.id, fixed_now(), "created"))
        .await
        .unwrap();

    assert!(SubscriptionRepository::delete(&store, subscription.id).await.unwrap());

    let left = HistoryStore::<Subscription>::list_for(&store, subscription.id)
        .await
        .unwrap();
    assert!(left.is_empty());
}

// --- message queues ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_client_message_keeps_its_snapshot(pool: PgPool) {
    let store = PgStore::new(pool);
    let client = make_client(Status::Pending);
    let mut message = ClientMessage::new(&client, Operation::Create).unwrap();
    message.header.created_at = fixed_now();
    message.header.callback_at = fixed_now() + TimeDelta::seconds(5);

    MessageStore::<ClientMessage>::insert(&store, &message).await.unwrap();

    let loaded = MessageStore::<ClientMessage>::get(&store, message.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, message);
    assert_eq!(loaded.snapshot().unwrap(), client);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_claim_next_takes_earliest_due_message_once(pool: PgPool) {
    // Arrange
    let store = PgStore::new(pool);
    let later = subscription_message(Uuid::new_v4(), fixed_now() + TimeDelta::seconds(6));
    let earlier = subscription_message(Uuid::new_v4(), fixed_now() + TimeDelta::seconds(4));
    let future = subscription_message(Uuid::new_v4(), fixed_now() + TimeDelta::minutes(5));
    for message in [&later, &earlier, &future] {
        MessageStore::<SubscriptionMessage>::insert(&store, message)
            .await
            .unwrap();
    }
    let now = fixed_now() + TimeDelta::seconds(10);

    // Act
    let first = MessageStore::<SubscriptionMessage>::claim_next(&store, now)
        .await
        .unwrap()
        .unwrap();
    let second = MessageStore::<SubscriptionMessage>::claim_next(&store, now)
        .await
        .unwrap()
        .unwrap();
    let third = MessageStore::<SubscriptionMessage>::claim_next(&store, now)
        .await
        .unwrap();

    // Assert
    assert_eq!(first.id(), earlier.id());
    assert_eq!(first.header.status, MessageStatus::Processed);
    assert_eq!(first.header.processed_at, Some(now));
    assert_eq!(second.id(), later.id());
    assert!(third.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_complete_refuses_terminal_messages(pool: PgPool) {
    let store = PgStore::new(pool);
    let message = subscription_message(Uuid::new_v4(), fixed_now());
    MessageStore::<SubscriptionMessage>::insert(&store, &message)
        .await
        .unwrap();
    let at = fixed_now() + TimeDelta::seconds(1);

    let failed = MessageStore::<SubscriptionMessage>::complete(
        &store,
        message.id(),
        MessageStatus::Failed,
        at,
    )
    .await
    .unwrap();
    let reprocessed = MessageStore::<SubscriptionMessage>::complete(
        &store,
        message.id(),
        MessageStatus::Processed,
        at + TimeDelta::seconds(1),
    )
    .await
    .unwrap();

    assert!(failed);
    assert!(!reprocessed);
    let loaded = MessageStore::<SubscriptionMessage>::get(&store, message.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.header.status, MessageStatus::Failed);
    assert_eq!(loaded.header.processed_at, Some(at));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_fail_outstanding_spares_the_kept_message(pool: PgPool) {
    let store = PgStore::new(pool);
    let client = make_client(Status::Active);
    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut message = ClientMessage::new(&client, Operation::Update).unwrap();
        message.header.created_at = fixed_now();
        message.header.callback_at = fixed_now();
        MessageStore::<ClientMessage>::insert(&store, &message).await.unwrap();
        ids.push(message.id());
    }

    let failed = MessageStore::<ClientMessage>::fail_outstanding(&store, client.id, ids[0], fixed_now())
        .await
        .unwrap();

    assert_eq!(failed, 2);
    let kept = MessageStore::<ClientMessage>::get(&store, ids[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.header.status, MessageStatus::Received);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_page_and_purge(pool: PgPool) {
    let store = PgStore::new(pool);
    for minute in 0..3 {
        let mut message = subscription_message(Uuid::new_v4(), fixed_now());
        message.header.created_at = fixed_now() + TimeDelta::minutes(minute);
        if minute == 0 {
            message.header.status = MessageStatus::Processed;
        }
        MessageStore::<SubscriptionMessage>::insert(&store, &message)
            .await
            .unwrap();
    }

    let page = MessageStore::<SubscriptionMessage>::page(&store, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].header.created_at, fixed_now() + TimeDelta::minutes(2));

    let purged = MessageStore::<SubscriptionMessage>::purge_pending(&store)
        .await
        .unwrap();
    assert_eq!(purged, 2);
}

// --- history ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_client_history_lists_in_write_order_and_deletes(pool: PgPool) {
    let store = PgStore::new(pool);
    let client_id = Uuid::new_v4();
    HistoryStore::<Client>::append(&store, &history(client_id, fixed_now(), "first"))
        .await
        .unwrap();
    HistoryStore::<Client>::append(&store, &history(client_id, fixed_now(), "second"))
        .await
        .unwrap();

    let notes: Vec<String> = HistoryStore::<Client>::list_for(&store, client_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.note)
        .collect();
    let deleted = HistoryStore::<Client>::delete_for(&store, client_id).await.unwrap();

    assert_eq!(notes, vec!["first", "second"]);
    assert_eq!(deleted, 2);
}
