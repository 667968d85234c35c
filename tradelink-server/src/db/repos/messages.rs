//! Message repository
//!
//! Insert order in the database is the authoritative chat order for a
//! link. Listing a page marks the reader's unread messages as read in
//! the same transaction: reads are not side-effect-free here.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tradelink_core::MessageKind;

use crate::models::{MessageDraft, Page};

use super::DbError;

/// Message record from database
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub link_id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub sales_rep_id: Option<i64>,
    pub content: String,
    pub message_type: MessageKind,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub product_id: Option<i64>,
    pub order_id: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const MESSAGE_COLUMNS: &str = "id, link_id, sender_id, receiver_id, sales_rep_id, content, \
     message_type, attachment_url, attachment_type, product_id, order_id, is_read, read_at, \
     created_at";

/// Message repository
pub struct MessageRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a composed message.
    pub async fn create(
        &self,
        link_id: i64,
        sender_id: i64,
        draft: MessageDraft,
    ) -> Result<Message, DbError> {
        let message = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages
                (link_id, sender_id, receiver_id, sales_rep_id, content, message_type,
                 attachment_url, attachment_type, product_id, order_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(link_id)
        .bind(sender_id)
        .bind(draft.receiver_id)
        .bind(draft.sales_rep_id)
        .bind(&draft.content)
        .bind(draft.kind)
        .bind(draft.attachment_url.as_deref())
        .bind(draft.attachment_type.as_deref())
        .bind(draft.product_id)
        .bind(draft.order_id)
        .fetch_one(self.pool)
        .await?;

        Ok(message)
    }

    /// Get a single message by ID.
    pub async fn get(&self, id: i64) -> Result<Message, DbError> {
        let message = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "message", id: id.to_string() })?;

        Ok(message)
    }

    /// List a page of a link's messages in chronological order.
    ///
    /// The page window is applied newest-first (so skip=0 is the latest
    /// messages), then reversed for the caller. Any returned message
    /// addressed to `reader_id` and still unread is marked read in the
    /// same transaction; calling again is a no-op.
    pub async fn list_for_link(
        &self,
        link_id: i64,
        reader_id: i64,
        page: Page,
    ) -> Result<Vec<Message>, DbError> {
        let mut tx = self.pool.begin().await?;

        let mut messages: Vec<Message> = sqlx::query_as(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE link_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(link_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&mut *tx)
        .await?;

        let unread: Vec<i64> = messages
            .iter()
            .filter(|m| m.receiver_id == Some(reader_id) && !m.is_read)
            .map(|m| m.id)
            .collect();

        if !unread.is_empty() {
            let stamped = sqlx::query(
                r#"
                UPDATE messages
                SET is_read = TRUE, read_at = NOW()
                WHERE id = ANY($1) AND receiver_id = $2 AND NOT is_read
                RETURNING id, read_at
                "#,
            )
            .bind(&unread)
            .bind(reader_id)
            .fetch_all(&mut *tx)
            .await?;

            for row in stamped {
                let id: i64 = row.get("id");
                let read_at: DateTime<Utc> = row.get("read_at");
                if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
                    message.is_read = true;
                    message.read_at = Some(read_at);
                }
            }
        }

        tx.commit().await?;

        messages.reverse();
        Ok(messages)
    }

    /// Mark a message read. Idempotent; the first read wins the stamp.
    /// The caller verifies the reader is the message's receiver.
    pub async fn mark_read(&self, id: i64) -> Result<Message, DbError> {
        let message = sqlx::query_as(&format!(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "message", id: id.to_string() })?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests - run with DATABASE_URL set
    // cargo test -p tradelink-server -- --ignored

    use super::*;
    use crate::db::repos::{LinkRepo, NewLink};
    use crate::models::{compose_message, MessageInput};
    use tradelink_core::{Actor, LinkStatus, UserRole};

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");
        crate::db::migrations::run(&pool).await.expect("migrations failed");
        pool
    }

    async fn seed_user(pool: &PgPool, email: &str, role: &str) -> i64 {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (email, full_name, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
            RETURNING id
            "#,
        )
        .bind(email)
        .bind("Test User")
        .bind(role)
        .fetch_one(pool)
        .await
        .expect("seed user")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn listing_marks_received_messages_read_once() {
        let pool = test_pool().await;
        let marker = std::process::id() as i64;
        let (supplier_id, consumer_id) = (9_000_000 + marker, 10_000_000 + marker);
        let consumer_user =
            seed_user(&pool, &format!("mc{marker}@consumer.example"), "consumer").await;
        let rep_user =
            seed_user(&pool, &format!("mr{marker}@supplier.example"), "sales_representative").await;

        let link_repo = LinkRepo::new(&pool);
        let link = link_repo
            .create(NewLink {
                supplier_id,
                consumer_id,
                request_message: None,
                requested_by_consumer: true,
            })
            .await
            .expect("create link")
            .expect("fresh pair");
        link_repo
            .set_status(link.id, LinkStatus::Pending, LinkStatus::Accepted)
            .await
            .expect("accept")
            .expect("first transition");

        // Rep sends to the consumer's user account.
        let rep = Actor::staff(rep_user, UserRole::SalesRepresentative, supplier_id);
        let draft = compose_message(
            &rep,
            MessageInput {
                content: Some("Your order ships tomorrow".into()),
                ..Default::default()
            },
            Some(consumer_user),
        )
        .expect("compose");
        let repo = MessageRepo::new(&pool);
        let sent = repo.create(link.id, rep_user, draft).await.expect("create");
        assert!(!sent.is_read);

        // Consumer lists the chat: the message flips to read.
        let listed = repo
            .list_for_link(link.id, consumer_user, Page::default())
            .await
            .expect("list");
        let seen = listed.iter().find(|m| m.id == sent.id).expect("message listed");
        assert!(seen.is_read);
        let first_read_at = seen.read_at.expect("read_at stamped");

        // Second listing is idempotent.
        let relisted = repo
            .list_for_link(link.id, consumer_user, Page::default())
            .await
            .expect("relist");
        let seen_again = relisted.iter().find(|m| m.id == sent.id).expect("still listed");
        assert!(seen_again.is_read);
        assert_eq!(seen_again.read_at, Some(first_read_at));
    }
}
