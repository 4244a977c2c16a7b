//! Database schema.
//!
//! Kept in sync with `migrations/`. Enum columns hold the variant name;
//! history rows are ordered by their `seq` column.

/// SQL creating every table and index.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS clients (
    id          UUID PRIMARY KEY,
    first_name  VARCHAR(255) NOT NULL,
    last_name   VARCHAR(255) NOT NULL,
    email       VARCHAR(255) NOT NULL,
    phone       VARCHAR(32)  NOT NULL,
    status      VARCHAR(32)  NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id          UUID PRIMARY KEY,
    client_id   UUID NOT NULL,
    product_id  UUID NOT NULL,
    status      VARCHAR(32) NOT NULL,
    payment     JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_client_id
    ON subscriptions (client_id);

CREATE TABLE IF NOT EXISTS client_messages (
    id            UUID PRIMARY KEY,
    client_id     UUID NOT NULL,
    client_json   TEXT NOT NULL,
    operation     VARCHAR(32) NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    status        VARCHAR(32) NOT NULL,
    callback_at   TIMESTAMPTZ NOT NULL,
    processed_at  TIMESTAMPTZ NULL
);

CREATE INDEX IF NOT EXISTS idx_client_messages_due
    ON client_messages (status, callback_at);

CREATE INDEX IF NOT EXISTS idx_client_messages_client_id
    ON client_messages (client_id);

CREATE TABLE IF NOT EXISTS subscription_messages (
    id               UUID PRIMARY KEY,
    subscription_id  UUID NOT NULL,
    operation        VARCHAR(32) NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    status           VARCHAR(32) NOT NULL,
    callback_at      TIMESTAMPTZ NOT NULL,
    processed_at     TIMESTAMPTZ NULL
);

CREATE INDEX IF NOT EXISTS idx_subscription_messages_due
    ON subscription_messages (status, callback_at);

CREATE INDEX IF NOT EXISTS idx_subscription_messages_subscription_id
    ON subscription_messages (subscription_id);

CREATE TABLE IF NOT EXISTS client_event_history (
    id               UUID PRIMARY KEY,
    seq              BIGSERIAL,
    client_id        UUID NOT NULL,
    rollback_id      UUID NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    operation        VARCHAR(32) NOT NULL,
    status_at_event  VARCHAR(32) NOT NULL,
    note             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_client_event_history_client_id
    ON client_event_history (client_id, seq);

CREATE TABLE IF NOT EXISTS subscription_event_history (
    id               UUID PRIMARY KEY,
    seq              BIGSERIAL,
    subscription_id  UUID NOT NULL REFERENCES subscriptions (id) ON DELETE CASCADE,
    rollback_id      UUID NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    operation        VARCHAR(32) NOT NULL,
    status_at_event  VARCHAR(32) NOT NULL,
    note             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subscription_event_history_subscription_id
    ON subscription_event_history (subscription_id, seq);
";
