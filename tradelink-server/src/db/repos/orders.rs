//! Order lookup - collaborator surface only
//!
//! Order CRUD belongs to the surrounding commerce service; complaints
//! and incidents only need to know who an order belongs to.

use sqlx::{FromRow, PgPool};

use super::DbError;

/// Order ownership record
#[derive(Debug, Clone, Copy, FromRow)]
pub struct Order {
    pub id: i64,
    pub consumer_id: i64,
    pub supplier_id: i64,
}

/// Order repository
pub struct OrderRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: i64) -> Result<Option<Order>, DbError> {
        let order = sqlx::query_as(
            "SELECT id, consumer_id, supplier_id FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }
}
