//! Incident repository
//!
//! Staff-raised problem records. No escalation tiers; assignment stays
//! within the supplier (verified by the caller before update).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tradelink_core::IncidentStatus;

use crate::models::Page;

use super::DbError;

/// Incident record from database
#[derive(Debug, Clone, FromRow)]
pub struct Incident {
    pub id: i64,
    pub order_id: Option<i64>,
    pub consumer_id: Option<i64>,
    pub supplier_id: i64,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub assigned_to_user_id: Option<i64>,
    pub created_by_user_id: i64,
    pub resolution: Option<String>,
    pub resolved_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// New incident
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub order_id: Option<i64>,
    pub consumer_id: Option<i64>,
    pub supplier_id: i64,
    pub title: String,
    pub description: String,
    pub assigned_to_user_id: i64,
    pub created_by_user_id: i64,
}

/// Field changes for an incident update
#[derive(Debug, Clone, Default)]
pub struct IncidentChanges {
    pub status: Option<IncidentStatus>,
    pub resolution: Option<String>,
    pub assigned_to_user_id: Option<i64>,
}

/// Filters for incident listings
#[derive(Debug, Clone, Copy, Default)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub assigned_to_user_id: Option<i64>,
}

const INCIDENT_COLUMNS: &str = "id, order_id, consumer_id, supplier_id, title, description, \
     status, assigned_to_user_id, created_by_user_id, resolution, resolved_by_user_id, \
     created_at, updated_at, resolved_at";

/// Incident repository
pub struct IncidentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> IncidentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewIncident) -> Result<Incident, DbError> {
        let incident = sqlx::query_as(&format!(
            r#"
            INSERT INTO incidents
                (order_id, consumer_id, supplier_id, title, description,
                 assigned_to_user_id, created_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INCIDENT_COLUMNS}
            "#,
        ))
        .bind(new.order_id)
        .bind(new.consumer_id)
        .bind(new.supplier_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.assigned_to_user_id)
        .bind(new.created_by_user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(incident)
    }

    pub async fn get(&self, id: i64) -> Result<Incident, DbError> {
        let incident = sqlx::query_as(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "incident", id: id.to_string() })?;

        Ok(incident)
    }

    /// Apply status/resolution/assignment changes. Moving to resolved
    /// stamps resolved_at and the resolving user.
    pub async fn update(
        &self,
        id: i64,
        changes: IncidentChanges,
        actor_id: i64,
    ) -> Result<Incident, DbError> {
        let incident = sqlx::query_as(&format!(
            r#"
            UPDATE incidents
            SET status = COALESCE($2, status),
                resolution = COALESCE($3, resolution),
                assigned_to_user_id = COALESCE($4, assigned_to_user_id),
                resolved_at = CASE WHEN $2::TEXT = 'resolved' THEN NOW() ELSE resolved_at END,
                resolved_by_user_id = CASE WHEN $2::TEXT = 'resolved' THEN $5 ELSE resolved_by_user_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INCIDENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.resolution.as_deref())
        .bind(changes.assigned_to_user_id)
        .bind(actor_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound { resource: "incident", id: id.to_string() })?;

        Ok(incident)
    }

    /// List a supplier's incidents, newest first.
    pub async fn list(
        &self,
        supplier_id: i64,
        filter: IncidentFilter,
        page: Page,
    ) -> Result<Vec<Incident>, DbError> {
        let incidents = sqlx::query_as(&format!(
            r#"
            SELECT {INCIDENT_COLUMNS} FROM incidents
            WHERE supplier_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::BIGINT IS NULL OR assigned_to_user_id = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(supplier_id)
        .bind(filter.status)
        .bind(filter.assigned_to_user_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(self.pool)
        .await?;

        Ok(incidents)
    }
}
