//! Database migrations
//!
//! Idempotent DDL, run at startup. The `users`, `consumers`, and
//! `orders` tables are the minimal surface of the surrounding CRUD
//! service that the core workflows read from.

use sqlx::PgPool;

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            supplier_id BIGINT,
            consumer_id BIGINT,
            api_token TEXT UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consumers (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id BIGSERIAL PRIMARY KEY,
            consumer_id BIGINT NOT NULL,
            supplier_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            id BIGSERIAL PRIMARY KEY,
            supplier_id BIGINT NOT NULL,
            consumer_id BIGINT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            requested_by_consumer BOOLEAN NOT NULL DEFAULT TRUE,
            request_message TEXT,
            assigned_sales_rep_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
            requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            responded_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            CONSTRAINT unique_supplier_consumer UNIQUE (supplier_id, consumer_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS complaints (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT NOT NULL REFERENCES orders(id),
            consumer_id BIGINT NOT NULL,
            supplier_id BIGINT NOT NULL,
            link_id BIGINT NOT NULL REFERENCES links(id),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            level TEXT NOT NULL DEFAULT 'sales',
            escalated_to_user_id BIGINT REFERENCES users(id),
            escalated_by_user_id BIGINT REFERENCES users(id),
            resolution TEXT,
            resolved_by_user_id BIGINT REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            resolved_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incidents (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT REFERENCES orders(id),
            consumer_id BIGINT,
            supplier_id BIGINT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            assigned_to_user_id BIGINT REFERENCES users(id),
            created_by_user_id BIGINT NOT NULL REFERENCES users(id),
            resolution TEXT,
            resolved_by_user_id BIGINT REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ,
            resolved_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id BIGSERIAL PRIMARY KEY,
            link_id BIGINT NOT NULL REFERENCES links(id),
            sender_id BIGINT NOT NULL REFERENCES users(id),
            receiver_id BIGINT REFERENCES users(id),
            sales_rep_id BIGINT REFERENCES users(id),
            content TEXT NOT NULL DEFAULT '',
            message_type TEXT NOT NULL DEFAULT 'text',
            attachment_url TEXT,
            attachment_type TEXT,
            product_id BIGINT,
            order_id BIGINT REFERENCES orders(id),
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            read_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_api_token ON users(api_token)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_consumer ON users(consumer_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_supplier ON links(supplier_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_consumer ON links(consumer_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_status ON links(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_complaints_supplier ON complaints(supplier_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_complaints_consumer ON complaints(consumer_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_complaints_link ON complaints(link_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_complaints_active ON complaints(link_id) WHERE status != 'resolved'",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_incidents_supplier ON incidents(supplier_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_incidents_assigned ON incidents(assigned_to_user_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_link ON messages(link_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_unread ON messages(receiver_id) WHERE NOT is_read",
    )
    .execute(pool)
    .await?;

    Ok(())
}
