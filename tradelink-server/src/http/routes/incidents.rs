//! Incident endpoints - manager/owner problem records

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tradelink_core::{require_role, IncidentStatus, UserRole};

use crate::db::repos::{
    Incident, IncidentChanges, IncidentFilter, IncidentRepo, NewIncident, OrderRepo, User, UserRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::models::{non_empty_text, IncidentTitle, Page, PageParams};

const MANAGEMENT: &[UserRole] = &[UserRole::Manager, UserRole::Owner];

/// Create incident request
#[derive(Deserialize)]
pub struct CreateIncidentRequest {
    pub title: String,
    pub description: String,
    pub order_id: Option<i64>,
    pub assigned_to_user_id: Option<i64>,
}

/// Update incident request
#[derive(Deserialize)]
pub struct UpdateIncidentRequest {
    pub status: Option<IncidentStatus>,
    pub resolution: Option<String>,
    pub assigned_to_user_id: Option<i64>,
}

/// Incident list query params
#[derive(Deserialize, Default)]
pub struct IncidentQuery {
    pub status: Option<IncidentStatus>,
    pub assigned_to_user_id: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Incident response
#[derive(Serialize)]
pub struct IncidentResponse {
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
    pub created_at: String,
    pub updated_at: Option<String>,
    pub resolved_at: Option<String>,
}

impl From<Incident> for IncidentResponse {
    fn from(i: Incident) -> Self {
        Self {
            id: i.id,
            order_id: i.order_id,
            consumer_id: i.consumer_id,
            supplier_id: i.supplier_id,
            title: i.title,
            description: i.description,
            status: i.status,
            assigned_to_user_id: i.assigned_to_user_id,
            created_by_user_id: i.created_by_user_id,
            resolution: i.resolution,
            resolved_by_user_id: i.resolved_by_user_id,
            created_at: i.created_at.to_rfc3339(),
            updated_at: i.updated_at.map(|t| t.to_rfc3339()),
            resolved_at: i.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// POST /incidents (manager/owner only)
async fn create_incident(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<IncidentResponse>), ApiError> {
    let actor = user.actor();
    require_role(&actor, MANAGEMENT)?;
    let own_supplier_id = actor
        .supplier_id
        .ok_or_else(|| ApiError::bad_request("user must be associated with a supplier"))?;

    let title = IncidentTitle::new(&req.title)?;
    let description = non_empty_text("description", &req.description)?;

    // An order reference pins the incident to that order's parties.
    let (consumer_id, supplier_id) = match req.order_id {
        Some(order_id) => match OrderRepo::new(&state.pool).find(order_id).await? {
            Some(order) => (Some(order.consumer_id), order.supplier_id),
            None => (None, own_supplier_id),
        },
        None => (None, own_supplier_id),
    };

    let incident = IncidentRepo::new(&state.pool)
        .create(NewIncident {
            order_id: req.order_id,
            consumer_id,
            supplier_id,
            title: title.into_string(),
            description,
            assigned_to_user_id: req.assigned_to_user_id.unwrap_or(actor.id),
            created_by_user_id: actor.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(IncidentResponse::from(incident))))
}

/// GET /incidents (manager/owner only)
async fn list_incidents(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<IncidentQuery>,
) -> Result<Json<Vec<IncidentResponse>>, ApiError> {
    let actor = user.actor();
    require_role(&actor, MANAGEMENT)?;
    let supplier_id = actor
        .supplier_id
        .ok_or_else(|| ApiError::bad_request("user must be associated with a supplier"))?;

    let incidents = IncidentRepo::new(&state.pool)
        .list(
            supplier_id,
            IncidentFilter {
                status: query.status,
                assigned_to_user_id: query.assigned_to_user_id,
            },
            Page::from(PageParams { skip: query.skip, limit: query.limit }),
        )
        .await?;

    Ok(Json(incidents.into_iter().map(IncidentResponse::from).collect()))
}

/// GET /incidents/{id} (manager/owner only)
async fn get_incident(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let actor = user.actor();
    require_role(&actor, MANAGEMENT)?;

    let incident = IncidentRepo::new(&state.pool).get(id).await?;
    if actor.supplier_id != Some(incident.supplier_id) {
        return Err(ApiError::forbidden("access denied"));
    }

    Ok(Json(IncidentResponse::from(incident)))
}

/// PUT /incidents/{id} (manager/owner only)
async fn update_incident(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateIncidentRequest>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let actor = user.actor();
    require_role(&actor, MANAGEMENT)?;

    let repo = IncidentRepo::new(&state.pool);
    let incident = repo.get(id).await?;
    if actor.supplier_id != Some(incident.supplier_id) {
        return Err(ApiError::forbidden("access denied"));
    }

    // Reassignment stays within the acting user's supplier. An outside
    // or unknown assignee is rejected, not silently dropped.
    if let Some(assignee_id) = req.assigned_to_user_id {
        let assignee = UserRepo::new(&state.pool).find_by_id(assignee_id).await?;
        if !assignment_allowed(assignee.as_ref(), actor.supplier_id) {
            return Err(ApiError::bad_request(
                "incidents can only be assigned to users of your supplier",
            ));
        }
    }
    let resolution = req
        .resolution
        .map(|r| non_empty_text("resolution", &r))
        .transpose()?;

    let updated = repo
        .update(
            id,
            IncidentChanges {
                status: req.status,
                resolution,
                assigned_to_user_id: req.assigned_to_user_id,
            },
            actor.id,
        )
        .await?;

    Ok(Json(IncidentResponse::from(updated)))
}

/// Whether an incident may be assigned to this user: they must exist
/// and share the acting user's supplier.
fn assignment_allowed(assignee: Option<&User>, actor_supplier: Option<i64>) -> bool {
    assignee.is_some_and(|a| a.supplier_id.is_some() && a.supplier_id == actor_supplier)
}

/// Incident routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/incidents", get(list_incidents).post(create_incident))
        .route("/incidents/{id}", get(get_incident).put(update_incident))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff_user(id: i64, role: UserRole, supplier_id: Option<i64>) -> User {
        User {
            id,
            email: format!("u{id}@supplier.example"),
            full_name: "Staff".into(),
            role,
            is_active: true,
            supplier_id,
            consumer_id: None,
        }
    }

    #[test]
    fn reassignment_within_supplier_is_allowed() {
        let assignee = staff_user(5, UserRole::SalesRepresentative, Some(3));
        assert!(assignment_allowed(Some(&assignee), Some(3)));
    }

    #[test]
    fn reassignment_outside_supplier_is_rejected() {
        let assignee = staff_user(5, UserRole::Manager, Some(4));
        assert!(!assignment_allowed(Some(&assignee), Some(3)));
    }

    #[test]
    fn reassignment_to_unknown_user_is_rejected() {
        assert!(!assignment_allowed(None, Some(3)));
    }

    #[test]
    fn reassignment_to_supplierless_user_is_rejected() {
        let assignee = staff_user(5, UserRole::Consumer, None);
        assert!(!assignment_allowed(Some(&assignee), None));
    }
}

