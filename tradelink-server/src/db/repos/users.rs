//! User repository - the identity/role oracle
//!
//! Token issuance and password handling live in the surrounding auth
//! service; this repo only resolves identities and role records.

use sqlx::{FromRow, PgPool};

use tradelink_core::{Actor, UserRole};

use super::DbError;

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub supplier_id: Option<i64>,
    pub consumer_id: Option<i64>,
}

impl User {
    /// The actor identity used by every policy check.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            supplier_id: self.supplier_id,
            consumer_id: self.consumer_id,
        }
    }
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a bearer credential to an active user.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, full_name, role, is_active, supplier_id, consumer_id
            FROM users
            WHERE api_token = $1 AND is_active
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, full_name, role, is_active, supplier_id, consumer_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// The user account tied to a consumer entity, if any.
    ///
    /// Used to address staff messages and to attribute the system
    /// message created with a complaint.
    pub async fn user_id_for_consumer(&self, consumer_id: i64) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE consumer_id = $1 AND is_active
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(consumer_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_carries_scope_ids() {
        let user = User {
            id: 7,
            email: "rep@supplier.example".into(),
            full_name: "Rep".into(),
            role: UserRole::SalesRepresentative,
            is_active: true,
            supplier_id: Some(3),
            consumer_id: None,
        };
        let actor = user.actor();
        assert_eq!(actor.id, 7);
        assert_eq!(actor.supplier_id, Some(3));
        assert_eq!(actor.consumer_id, None);
    }
}
