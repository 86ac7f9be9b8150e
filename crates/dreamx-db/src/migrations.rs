//! Startup schema migrations
//!
//! The base schema is created with `IF NOT EXISTS` statements. Columns added
//! after a table first shipped are listed in [`ADDITIVE_COLUMNS`] and applied
//! only when `PRAGMA table_info` does not report them, so running the
//! migrations any number of times converges on the same schema.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

const TABLES: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        id              INTEGER PRIMARY KEY,
        username        TEXT NOT NULL COLLATE NOCASE UNIQUE,
        email           TEXT NOT NULL COLLATE NOCASE UNIQUE,
        display_name    TEXT NOT NULL,
        password_hash   TEXT,
        avatar          TEXT,
        bio             TEXT,
        role            TEXT NOT NULL DEFAULT 'user',
        status          TEXT NOT NULL DEFAULT 'active',
        email_verified  INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL,
        last_login_at   TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS oauth_accounts (
        id                INTEGER PRIMARY KEY,
        user_id           INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        provider          TEXT NOT NULL,
        provider_user_id  TEXT NOT NULL,
        email             TEXT,
        created_at        TEXT NOT NULL,
        UNIQUE (provider, provider_user_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS webauthn_credentials (
        id             INTEGER PRIMARY KEY,
        user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        credential_id  TEXT NOT NULL UNIQUE,
        public_key     BLOB NOT NULL,
        sign_count     INTEGER NOT NULL DEFAULT 0,
        name           TEXT NOT NULL,
        created_at     TEXT NOT NULL,
        last_used_at   TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id          INTEGER PRIMARY KEY,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        token_hash  TEXT NOT NULL UNIQUE,
        expires_at  TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        revoked_at  TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS auth_challenges (
        token       TEXT PRIMARY KEY,
        purpose     TEXT NOT NULL,
        user_id     INTEGER REFERENCES users(id) ON DELETE CASCADE,
        data        TEXT,
        expires_at  TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS posts (
        id          INTEGER PRIMARY KEY,
        author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content     TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS comments (
        id          INTEGER PRIMARY KEY,
        post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        parent_id   INTEGER REFERENCES comments(id) ON DELETE CASCADE,
        content     TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS post_reactions (
        post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        PRIMARY KEY (post_id, user_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS comment_likes (
        comment_id  INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind        TEXT NOT NULL DEFAULT 'like',
        created_at  TEXT NOT NULL,
        PRIMARY KEY (comment_id, user_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS conversations (
        id          INTEGER PRIMARY KEY,
        kind        TEXT NOT NULL,
        name        TEXT,
        owner_id    INTEGER REFERENCES users(id) ON DELETE SET NULL,
        direct_key  TEXT UNIQUE,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS conversation_members (
        conversation_id  INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        user_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role             TEXT NOT NULL DEFAULT 'member',
        joined_at        TEXT NOT NULL,
        last_read_at     TEXT,
        PRIMARY KEY (conversation_id, user_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS messages (
        id               INTEGER PRIMARY KEY,
        conversation_id  INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        sender_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content          TEXT NOT NULL DEFAULT '',
        created_at       TEXT NOT NULL,
        edited_at        TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS message_reactions (
        message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        PRIMARY KEY (message_id, user_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS notifications (
        id          INTEGER PRIMARY KEY,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        actor_id    INTEGER REFERENCES users(id) ON DELETE SET NULL,
        kind        TEXT NOT NULL,
        body        TEXT NOT NULL,
        link        TEXT,
        read_at     TEXT,
        created_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS push_subscriptions (
        id          INTEGER PRIMARY KEY,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        endpoint    TEXT NOT NULL UNIQUE,
        p256dh      TEXT NOT NULL,
        auth        TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS services (
        id             INTEGER PRIMARY KEY,
        seller_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title          TEXT NOT NULL,
        description    TEXT NOT NULL,
        category       TEXT NOT NULL,
        price_cents    INTEGER NOT NULL,
        currency       TEXT NOT NULL DEFAULT 'usd',
        delivery_days  INTEGER NOT NULL DEFAULT 7,
        status         TEXT NOT NULL DEFAULT 'active',
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS service_orders (
        id            INTEGER PRIMARY KEY,
        service_id    INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
        buyer_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        seller_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        price_cents   INTEGER NOT NULL,
        currency      TEXT NOT NULL,
        requirements  TEXT,
        status        TEXT NOT NULL DEFAULT 'pending',
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL,
        completed_at  TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS service_reviews (
        id           INTEGER PRIMARY KEY,
        service_id   INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
        order_id     INTEGER NOT NULL REFERENCES service_orders(id) ON DELETE CASCADE,
        reviewer_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        rating       INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comment      TEXT,
        created_at   TEXT NOT NULL,
        UNIQUE (service_id, reviewer_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id                        INTEGER PRIMARY KEY,
        user_id                   INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        plan                      TEXT NOT NULL,
        status                    TEXT NOT NULL,
        provider                  TEXT NOT NULL,
        provider_subscription_id  TEXT NOT NULL,
        current_period_end        TEXT,
        cancel_at_period_end      INTEGER NOT NULL DEFAULT 0,
        created_at                TEXT NOT NULL,
        updated_at                TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS payment_methods (
        id                  INTEGER PRIMARY KEY,
        user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        provider            TEXT NOT NULL,
        provider_method_id  TEXT NOT NULL,
        brand               TEXT,
        last4               TEXT,
        exp_month           INTEGER,
        exp_year            INTEGER,
        is_default          INTEGER NOT NULL DEFAULT 0,
        created_at          TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS invoices (
        id                   INTEGER PRIMARY KEY,
        user_id              INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        subscription_id      INTEGER,
        provider             TEXT NOT NULL,
        provider_invoice_id  TEXT,
        amount_cents         INTEGER NOT NULL,
        currency             TEXT NOT NULL,
        status               TEXT NOT NULL,
        description          TEXT,
        created_at           TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS payment_customers (
        user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        provider     TEXT NOT NULL,
        customer_id  TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        PRIMARY KEY (user_id, provider)
    )",
    r"
    CREATE TABLE IF NOT EXISTS payment_events (
        provider     TEXT NOT NULL,
        event_id     TEXT NOT NULL,
        received_at  TEXT NOT NULL,
        PRIMARY KEY (provider, event_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS blocks (
        blocker_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        blocked_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at  TEXT NOT NULL,
        PRIMARY KEY (blocker_id, blocked_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS reports (
        id               INTEGER PRIMARY KEY,
        reporter_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        subject_type     TEXT NOT NULL,
        subject_id       INTEGER NOT NULL,
        reason           TEXT NOT NULL,
        details          TEXT,
        status           TEXT NOT NULL DEFAULT 'open',
        reviewer_id      INTEGER,
        resolution_note  TEXT,
        created_at       TEXT NOT NULL,
        resolved_at      TEXT
    )",
    r"
    CREATE TABLE IF NOT EXISTS audit_log (
        id           INTEGER PRIMARY KEY,
        actor_id     INTEGER NOT NULL,
        action       TEXT NOT NULL,
        target_type  TEXT NOT NULL,
        target_id    INTEGER,
        details      TEXT NOT NULL DEFAULT '{}',
        created_at   TEXT NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS appeals (
        id             INTEGER PRIMARY KEY,
        user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind           TEXT NOT NULL,
        subject_id     INTEGER,
        message        TEXT NOT NULL,
        status         TEXT NOT NULL DEFAULT 'pending',
        reviewer_id    INTEGER,
        decision_note  TEXT,
        created_at     TEXT NOT NULL,
        decided_at     TEXT
    )",
];

/// Columns introduced after their table first shipped: `(table, column, definition)`
pub const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "location", "TEXT"),
    ("users", "website", "TEXT"),
    ("users", "suspended_until", "TEXT"),
    ("users", "suspension_reason", "TEXT"),
    ("users", "notify_email", "INTEGER NOT NULL DEFAULT 1"),
    ("users", "notify_push", "INTEGER NOT NULL DEFAULT 1"),
    ("users", "profile_visibility", "TEXT NOT NULL DEFAULT 'public'"),
    ("users", "allow_messages", "TEXT NOT NULL DEFAULT 'everyone'"),
    ("posts", "image", "TEXT"),
    ("messages", "attachment", "TEXT"),
    ("notifications", "data", "TEXT NOT NULL DEFAULT '{}'"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_oauth_accounts_user ON oauth_accounts(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_webauthn_user ON webauthn_credentials(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_members_user ON conversation_members(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_push_user ON push_subscriptions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_services_seller ON services(seller_id)",
    "CREATE INDEX IF NOT EXISTS idx_services_category ON services(category, status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_buyer ON service_orders(buyer_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_seller ON service_orders(seller_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_service_buyer ON service_orders(service_id, buyer_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_payment_methods_user ON payment_methods(user_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_payment_methods_default ON payment_methods(user_id) WHERE is_default = 1",
    "CREATE INDEX IF NOT EXISTS idx_invoices_user ON invoices(user_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_provider ON subscriptions(provider, provider_subscription_id)",
    "CREATE INDEX IF NOT EXISTS idx_blocks_blocked ON blocks(blocked_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_open ON reports(reporter_id, subject_type, subject_id) WHERE status = 'open'",
    "CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status, id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_appeals_pending ON appeals(user_id, kind, COALESCE(subject_id, 0)) WHERE status = 'pending'",
    "CREATE INDEX IF NOT EXISTS idx_appeals_status ON appeals(status, id)",
];

/// Bring the schema up to date
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in TABLES {
        sqlx::query(statement).execute(pool).await?;
    }

    let mut added = 0usize;
    for (table, column, definition) in ADDITIVE_COLUMNS {
        if add_column_if_missing(pool, table, column, definition).await? {
            added += 1;
        }
    }

    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!(tables = TABLES.len(), columns_added = added, "Migrations applied");
    Ok(())
}

/// Whether `table` already has `column`
pub async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
}

async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool, sqlx::Error> {
    if column_exists(pool, table, column).await? {
        debug!(table, column, "Column present");
        return Ok(false);
    }

    let statement = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
    match sqlx::query(&statement).execute(pool).await {
        Ok(_) => {
            info!(table, column, "Column added");
            Ok(true)
        }
        // another process may have won the race between the check and the ALTER
        Err(e) if e.to_string().contains("duplicate column") => {
            warn!(table, column, "Column already exists");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
