//! Link repository - supplier-consumer relationships
//!
//! Creation relies on the unique (supplier_id, consumer_id) constraint
//! via ON CONFLICT; status changes and assignment are conditional
//! UPDATEs so concurrent writers observe each other. List queries
//! compute the active-complaint flag with a correlated EXISTS in the
//! same query.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tradelink_core::LinkStatus;

use crate::models::Page;

use super::DbError;

/// Link record from database
#[derive(Debug, Clone, FromRow)]
pub struct Link {
    pub id: i64,
    pub supplier_id: i64,
    pub consumer_id: i64,
    pub status: LinkStatus,
    pub requested_by_consumer: bool,
    pub request_message: Option<String>,
    pub assigned_sales_rep_id: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Link with its unresolved-complaint flag, for read views
#[derive(Debug, Clone, FromRow)]
pub struct LinkOverview {
    pub id: i64,
    pub supplier_id: i64,
    pub consumer_id: i64,
    pub status: LinkStatus,
    pub requested_by_consumer: bool,
    pub request_message: Option<String>,
    pub assigned_sales_rep_id: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub has_active_complaint: bool,
}

/// New link request
#[derive(Debug, Clone)]
pub struct NewLink {
    pub supplier_id: i64,
    pub consumer_id: i64,
    pub request_message: Option<String>,
    pub requested_by_consumer: bool,
}

/// Optional filters for link listings; scoping is applied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkFilter {
    pub supplier_id: Option<i64>,
    pub consumer_id: Option<i64>,
    pub status: Option<LinkStatus>,
}

const LINK_COLUMNS: &str = "id, supplier_id, consumer_id, status, requested_by_consumer, \
     request_message, assigned_sales_rep_id, requested_at, responded_at, created_at, updated_at";

const OVERVIEW_SELECT: &str = r#"
    SELECT
        l.id, l.supplier_id, l.consumer_id, l.status,
        l.requested_by_consumer, l.request_message, l.assigned_sales_rep_id,
        l.requested_at, l.responded_at, l.created_at, l.updated_at,
        EXISTS(
            SELECT 1 FROM complaints c
            WHERE c.link_id = l.id AND c.status != 'resolved'
        ) AS has_active_complaint
    FROM links l
"#;

/// Link repository
pub struct LinkRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LinkRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending link for a supplier-consumer pair.
    ///
    /// Returns `None` when a link for the pair already exists (the
    /// caller maps this to a conflict).
    pub async fn create(&self, new: NewLink) -> Result<Option<Link>, DbError> {
        let link = sqlx::query_as(&format!(
            r#"
            INSERT INTO links (supplier_id, consumer_id, request_message, requested_by_consumer)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (supplier_id, consumer_id) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#,
        ))
        .bind(new.supplier_id)
        .bind(new.consumer_id)
        .bind(new.request_message.as_deref())
        .bind(new.requested_by_consumer)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// Get a single link with its active-complaint flag.
    pub async fn get(&self, id: i64) -> Result<LinkOverview, DbError> {
        let link = sqlx::query_as(&format!("{OVERVIEW_SELECT} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound { resource: "link", id: id.to_string() })?;

        Ok(link)
    }

    /// The link between a supplier and a consumer, whatever its status.
    pub async fn find_by_pair(
        &self,
        supplier_id: i64,
        consumer_id: i64,
    ) -> Result<Option<Link>, DbError> {
        let link = sqlx::query_as(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE supplier_id = $1 AND consumer_id = $2",
        ))
        .bind(supplier_id)
        .bind(consumer_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// Move a link from `from` to `to`, stamping responded_at.
    ///
    /// Conditional on the current status so a concurrent responder
    /// cannot double-apply a transition; `None` means the link was no
    /// longer in `from`.
    pub async fn set_status(
        &self,
        id: i64,
        from: LinkStatus,
        to: LinkStatus,
    ) -> Result<Option<Link>, DbError> {
        let link = sqlx::query_as(&format!(
            r#"
            UPDATE links
            SET status = $3, responded_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {LINK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// Assign the chat to a sales rep; only accepted links qualify.
    /// `None` means the link is not currently accepted.
    pub async fn assign(&self, id: i64, sales_rep_id: i64) -> Result<Option<Link>, DbError> {
        let link = sqlx::query_as(&format!(
            r#"
            UPDATE links
            SET assigned_sales_rep_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'accepted'
            RETURNING {LINK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(sales_rep_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// Clear the chat assignment.
    pub async fn unassign(&self, id: i64) -> Result<Link, DbError> {
        let link = sqlx::query_as(&format!(
            r#"
            UPDATE links
            SET assigned_sales_rep_id = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {LINK_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "link", id: id.to_string() })?;

        Ok(link)
    }

    /// List links matching the filter, newest first, with complaint flags.
    pub async fn list(&self, filter: LinkFilter, page: Page) -> Result<Vec<LinkOverview>, DbError> {
        let links = sqlx::query_as(&format!(
            r#"
            {OVERVIEW_SELECT}
            WHERE ($1::BIGINT IS NULL OR l.supplier_id = $1)
              AND ($2::BIGINT IS NULL OR l.consumer_id = $2)
              AND ($3::TEXT IS NULL OR l.status = $3)
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(filter.supplier_id)
        .bind(filter.consumer_id)
        .bind(filter.status)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(links)
    }

    /// Accepted links of a supplier assigned to the given sales rep.
    pub async fn assigned_to(
        &self,
        supplier_id: i64,
        sales_rep_id: i64,
        page: Page,
    ) -> Result<Vec<LinkOverview>, DbError> {
        let links = sqlx::query_as(&format!(
            r#"
            {OVERVIEW_SELECT}
            WHERE l.supplier_id = $1
              AND l.assigned_sales_rep_id = $2
              AND l.status = 'accepted'
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(supplier_id)
        .bind(sales_rep_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(links)
    }

    /// Accepted links of a supplier that are unassigned or assigned to
    /// someone other than the given sales rep.
    pub async fn unassigned_or_other(
        &self,
        supplier_id: i64,
        sales_rep_id: i64,
        page: Page,
    ) -> Result<Vec<LinkOverview>, DbError> {
        let links = sqlx::query_as(&format!(
            r#"
            {OVERVIEW_SELECT}
            WHERE l.supplier_id = $1
              AND l.status = 'accepted'
              AND (l.assigned_sales_rep_id IS NULL OR l.assigned_sales_rep_id != $2)
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(supplier_id)
        .bind(sales_rep_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(links)
    }

    /// All accepted links of a consumer.
    pub async fn accepted_for_consumer(
        &self,
        consumer_id: i64,
        page: Page,
    ) -> Result<Vec<LinkOverview>, DbError> {
        let links = sqlx::query_as(&format!(
            r#"
            {OVERVIEW_SELECT}
            WHERE l.consumer_id = $1 AND l.status = 'accepted'
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(consumer_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests - run with DATABASE_URL set
    // cargo test -p tradelink-server -- --ignored

    use super::*;
    use crate::db::migrations;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        pool
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_pair_yields_one_row() {
        let pool = test_pool().await;
        let repo = LinkRepo::new(&pool);
        // Distinct pair per run keeps reruns independent.
        let marker = std::process::id() as i64;
        let new = NewLink {
            supplier_id: 1_000_000 + marker,
            consumer_id: 2_000_000 + marker,
            request_message: Some("please link".into()),
            requested_by_consumer: true,
        };

        let first = repo.create(new.clone()).await.expect("create failed");
        assert!(first.is_some());

        let second = repo.create(new).await.expect("create failed");
        assert!(second.is_none(), "second insert must observe the conflict");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn conditional_status_change_applies_once() {
        let pool = test_pool().await;
        let repo = LinkRepo::new(&pool);
        let marker = std::process::id() as i64;
        let link = repo
            .create(NewLink {
                supplier_id: 3_000_000 + marker,
                consumer_id: 4_000_000 + marker,
                request_message: None,
                requested_by_consumer: false,
            })
            .await
            .expect("create failed")
            .expect("fresh pair");

        let accepted = repo
            .set_status(link.id, LinkStatus::Pending, LinkStatus::Accepted)
            .await
            .expect("update failed");
        assert_eq!(accepted.expect("first transition wins").status, LinkStatus::Accepted);

        let replay = repo
            .set_status(link.id, LinkStatus::Pending, LinkStatus::Accepted)
            .await
            .expect("update failed");
        assert!(replay.is_none(), "stale transition must not apply");
    }
}
