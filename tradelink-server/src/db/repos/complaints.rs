//! Complaint repository
//!
//! Complaint creation inserts the complaint and its system chat message
//! in one transaction; neither row exists without the other. Escalation
//! is a conditional UPDATE keyed on the current level, so of two
//! concurrent escalations exactly one can succeed.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tradelink_core::{ComplaintLevel, ComplaintStatus};

use crate::models::Page;

use super::DbError;

/// Complaint record from database
#[derive(Debug, Clone, FromRow)]
pub struct Complaint {
    pub id: i64,
    pub order_id: i64,
    pub consumer_id: i64,
    pub supplier_id: i64,
    pub link_id: i64,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub level: ComplaintLevel,
    pub escalated_to_user_id: Option<i64>,
    pub escalated_by_user_id: Option<i64>,
    pub resolution: Option<String>,
    pub resolved_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// New complaint, already validated and resolved against its order/link
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub order_id: i64,
    pub consumer_id: i64,
    pub supplier_id: i64,
    pub link_id: i64,
    pub title: String,
    pub description: String,
}

/// Field changes for a complaint update
#[derive(Debug, Clone, Default)]
pub struct ComplaintChanges {
    pub status: Option<ComplaintStatus>,
    pub resolution: Option<String>,
    pub level: Option<ComplaintLevel>,
}

/// Filters for complaint listings; `scope_level` comes from the actor's
/// role, `level` from the caller's query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplaintFilter {
    pub supplier_id: Option<i64>,
    pub consumer_id: Option<i64>,
    pub scope_level: Option<ComplaintLevel>,
    pub level: Option<ComplaintLevel>,
    pub status: Option<ComplaintStatus>,
}

const COMPLAINT_COLUMNS: &str = "id, order_id, consumer_id, supplier_id, link_id, title, \
     description, status, level, escalated_to_user_id, escalated_by_user_id, resolution, \
     resolved_by_user_id, created_at, updated_at, resolved_at";

/// Complaint repository
pub struct ComplaintRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ComplaintRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a complaint and post its system message into the link's
    /// chat, atomically.
    ///
    /// The message is sent from `message_sender_id` (the consumer's user
    /// account, or the acting user when none exists) to no one in
    /// particular, so it lands in front of any supplier staff.
    pub async fn create_with_message(
        &self,
        new: NewComplaint,
        message_sender_id: i64,
    ) -> Result<Complaint, DbError> {
        let mut tx = self.pool.begin().await?;

        let complaint: Complaint = sqlx::query_as(&format!(
            r#"
            INSERT INTO complaints (order_id, consumer_id, supplier_id, link_id, title, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COMPLAINT_COLUMNS}
            "#,
        ))
        .bind(new.order_id)
        .bind(new.consumer_id)
        .bind(new.supplier_id)
        .bind(new.link_id)
        .bind(&new.title)
        .bind(&new.description)
        .fetch_one(&mut *tx)
        .await?;

        let content = format!("Complaint: {}\n\n{}", new.title, new.description);
        sqlx::query(
            r#"
            INSERT INTO messages (link_id, sender_id, receiver_id, content, message_type, order_id)
            VALUES ($1, $2, NULL, $3, 'text', $4)
            "#,
        )
        .bind(new.link_id)
        .bind(message_sender_id)
        .bind(&content)
        .bind(new.order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(complaint)
    }

    /// Get a single complaint by ID.
    pub async fn get(&self, id: i64) -> Result<Complaint, DbError> {
        let complaint = sqlx::query_as(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "complaint", id: id.to_string() })?;

        Ok(complaint)
    }

    /// Escalate a sales-level complaint to manager visibility.
    ///
    /// Conditional on `level = 'sales'`: of two concurrent escalations
    /// only the first matches, the loser gets `None` and must report the
    /// complaint as already escalated.
    pub async fn escalate(
        &self,
        id: i64,
        escalated_to_user_id: i64,
        escalated_by_user_id: i64,
    ) -> Result<Option<Complaint>, DbError> {
        let complaint = sqlx::query_as(&format!(
            r#"
            UPDATE complaints
            SET level = 'manager',
                status = 'escalated',
                escalated_to_user_id = $2,
                escalated_by_user_id = $3,
                updated_at = NOW()
            WHERE id = $1 AND level = 'sales'
            RETURNING {COMPLAINT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(escalated_to_user_id)
        .bind(escalated_by_user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(complaint)
    }

    /// Apply status/resolution/level changes. Moving to resolved stamps
    /// resolved_at and the resolving user.
    pub async fn update(
        &self,
        id: i64,
        changes: ComplaintChanges,
        actor_id: i64,
    ) -> Result<Complaint, DbError> {
        let complaint = sqlx::query_as(&format!(
            r#"
            UPDATE complaints
            SET status = COALESCE($2, status),
                resolution = COALESCE($3, resolution),
                level = COALESCE($4, level),
                resolved_at = CASE WHEN $2::TEXT = 'resolved' THEN NOW() ELSE resolved_at END,
                resolved_by_user_id = CASE WHEN $2::TEXT = 'resolved' THEN $5 ELSE resolved_by_user_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COMPLAINT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.resolution.as_deref())
        .bind(changes.level)
        .bind(actor_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "complaint", id: id.to_string() })?;

        Ok(complaint)
    }

    /// List complaints matching the filter, newest first.
    pub async fn list(
        &self,
        filter: ComplaintFilter,
        page: Page,
    ) -> Result<Vec<Complaint>, DbError> {
        let complaints = sqlx::query_as(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS} FROM complaints
            WHERE ($1::BIGINT IS NULL OR supplier_id = $1)
              AND ($2::BIGINT IS NULL OR consumer_id = $2)
              AND ($3::TEXT IS NULL OR level = $3)
              AND ($4::TEXT IS NULL OR level = $4)
              AND ($5::TEXT IS NULL OR status = $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        ))
        .bind(filter.supplier_id)
        .bind(filter.consumer_id)
        .bind(filter.scope_level)
        .bind(filter.level)
        .bind(filter.status)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(complaints)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests - run with DATABASE_URL set
    // cargo test -p tradelink-server -- --ignored

    use super::*;
    use crate::db::repos::{LinkRepo, MessageRepo, NewLink};
    use tradelink_core::LinkStatus;

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

    async fn seed_accepted_link(pool: &PgPool, supplier_id: i64, consumer_id: i64) -> i64 {
        let repo = LinkRepo::new(pool);
        let link = repo
            .create(NewLink {
                supplier_id,
                consumer_id,
                request_message: None,
                requested_by_consumer: true,
            })
            .await
            .expect("create link")
            .expect("fresh pair");
        repo.set_status(link.id, LinkStatus::Pending, LinkStatus::Accepted)
            .await
            .expect("accept link")
            .expect("first transition");
        link.id
    }

    async fn seed_order(pool: &PgPool, consumer_id: i64, supplier_id: i64) -> i64 {
        sqlx::query_scalar("INSERT INTO orders (consumer_id, supplier_id) VALUES ($1, $2) RETURNING id")
            .bind(consumer_id)
            .bind(supplier_id)
            .fetch_one(pool)
            .await
            .expect("seed order")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn creation_posts_system_message_atomically() {
        let pool = test_pool().await;
        let marker = std::process::id() as i64;
        let (supplier_id, consumer_id) = (5_000_000 + marker, 6_000_000 + marker);
        let sender = seed_user(&pool, &format!("c{marker}@consumer.example"), "consumer").await;
        let link_id = seed_accepted_link(&pool, supplier_id, consumer_id).await;
        let order_id = seed_order(&pool, consumer_id, supplier_id).await;

        let complaint = ComplaintRepo::new(&pool)
            .create_with_message(
                NewComplaint {
                    order_id,
                    consumer_id,
                    supplier_id,
                    link_id,
                    title: "Late delivery".into(),
                    description: "Order arrived two days late".into(),
                },
                sender,
            )
            .await
            .expect("create complaint");

        assert_eq!(complaint.status, ComplaintStatus::Open);
        assert_eq!(complaint.level, ComplaintLevel::Sales);

        let messages = MessageRepo::new(&pool)
            .list_for_link(link_id, sender, Page::default())
            .await
            .expect("list messages");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("Late delivery"));
        assert!(messages[0].content.contains("two days late"));
        assert_eq!(messages[0].receiver_id, None);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_escalation_has_one_winner() {
        let pool = test_pool().await;
        let marker = std::process::id() as i64;
        let (supplier_id, consumer_id) = (7_000_000 + marker, 8_000_000 + marker);
        let sender = seed_user(&pool, &format!("c2{marker}@consumer.example"), "consumer").await;
        let rep = seed_user(&pool, &format!("rep{marker}@supplier.example"), "sales_representative").await;
        let manager_a = seed_user(&pool, &format!("mgr-a{marker}@supplier.example"), "manager").await;
        let manager_b = seed_user(&pool, &format!("mgr-b{marker}@supplier.example"), "manager").await;
        let link_id = seed_accepted_link(&pool, supplier_id, consumer_id).await;
        let order_id = seed_order(&pool, consumer_id, supplier_id).await;

        let complaint = ComplaintRepo::new(&pool)
            .create_with_message(
                NewComplaint {
                    order_id,
                    consumer_id,
                    supplier_id,
                    link_id,
                    title: "Wrong items".into(),
                    description: "Half the crates were substituted".into(),
                },
                sender,
            )
            .await
            .expect("create complaint");

        let pool_a = pool.clone();
        let pool_b = pool.clone();
        let id = complaint.id;
        let (a, b) = tokio::join!(
            tokio::spawn(async move { ComplaintRepo::new(&pool_a).escalate(id, manager_a, rep).await }),
            tokio::spawn(async move { ComplaintRepo::new(&pool_b).escalate(id, manager_b, rep).await }),
        );
        let a = a.expect("task").expect("query");
        let b = b.expect("task").expect("query");

        assert!(
            a.is_some() != b.is_some(),
            "exactly one concurrent escalation must win"
        );
        let winner = a.or(b).expect("one winner");
        assert_eq!(winner.level, ComplaintLevel::Manager);
        assert_eq!(winner.status, ComplaintStatus::Escalated);

        let stored = ComplaintRepo::new(&pool).get(id).await.expect("get");
        assert_eq!(stored.level, ComplaintLevel::Manager);
    }
}
