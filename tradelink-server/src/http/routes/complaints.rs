//! Complaint endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tradelink_core::{
    can_view_complaint, complaint_scope, require_role, ComplaintLevel, ComplaintScope,
    ComplaintStatus, LinkStatus, UserRole,
};

use crate::db::repos::{
    Complaint, ComplaintChanges, ComplaintFilter, ComplaintRepo, LinkRepo, NewComplaint,
    OrderRepo, UserRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::models::{non_empty_text, ComplaintTitle, Page, PageParams};

/// Create complaint request
#[derive(Deserialize)]
pub struct CreateComplaintRequest {
    pub order_id: i64,
    pub title: String,
    pub description: String,
}

/// Escalate complaint request
#[derive(Deserialize)]
pub struct EscalateComplaintRequest {
    pub escalated_to_user_id: i64,
}

/// Update complaint request
#[derive(Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: Option<ComplaintStatus>,
    pub resolution: Option<String>,
    pub level: Option<ComplaintLevel>,
}

/// Complaint list query params
#[derive(Deserialize, Default)]
pub struct ComplaintQuery {
    pub consumer_id: Option<i64>,
    pub status: Option<ComplaintStatus>,
    pub level: Option<ComplaintLevel>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Complaint response
#[derive(Serialize)]
pub struct ComplaintResponse {
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
    pub created_at: String,
    pub updated_at: Option<String>,
    pub resolved_at: Option<String>,
}

impl From<Complaint> for ComplaintResponse {
    fn from(c: Complaint) -> Self {
        Self {
            id: c.id,
            order_id: c.order_id,
            consumer_id: c.consumer_id,
            supplier_id: c.supplier_id,
            link_id: c.link_id,
            title: c.title,
            description: c.description,
            status: c.status,
            level: c.level,
            escalated_to_user_id: c.escalated_to_user_id,
            escalated_by_user_id: c.escalated_by_user_id,
            resolution: c.resolution,
            resolved_by_user_id: c.resolved_by_user_id,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.map(|t| t.to_rfc3339()),
            resolved_at: c.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// POST /complaints - raise a complaint against an order (consumer only)
///
/// The complaint and its system chat message commit together.
async fn create_complaint(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<ComplaintResponse>), ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::Consumer])?;

    let title = ComplaintTitle::new(&req.title)?;
    let description = non_empty_text("description", &req.description)?;

    let order = OrderRepo::new(&state.pool)
        .find(req.order_id)
        .await?
        .ok_or(ApiError::NotFound { resource: "order", id: req.order_id.to_string() })?;

    if actor.consumer_id != Some(order.consumer_id) {
        return Err(ApiError::forbidden(
            "you can only create complaints for your own orders",
        ));
    }

    let link = LinkRepo::new(&state.pool)
        .find_by_pair(order.supplier_id, order.consumer_id)
        .await?;
    let link = match link {
        Some(link) if link.status == LinkStatus::Blocked => {
            return Err(ApiError::forbidden(
                "cannot create complaint: your link with this supplier is blocked",
            ));
        }
        Some(link) if link.status == LinkStatus::Accepted => link,
        _ => {
            return Err(ApiError::forbidden(
                "you must have an accepted link with the supplier to create a complaint",
            ));
        }
    };

    // The system message is attributed to the consumer's user account,
    // falling back to whoever raised the complaint.
    let sender_id = UserRepo::new(&state.pool)
        .user_id_for_consumer(order.consumer_id)
        .await?
        .unwrap_or(actor.id);

    let complaint = ComplaintRepo::new(&state.pool)
        .create_with_message(
            NewComplaint {
                order_id: order.id,
                consumer_id: order.consumer_id,
                supplier_id: order.supplier_id,
                link_id: link.id,
                title: title.into_string(),
                description,
            },
            sender_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ComplaintResponse::from(complaint))))
}

/// GET /complaints - role-scoped complaint listing
async fn list_complaints(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ComplaintQuery>,
) -> Result<Json<Vec<ComplaintResponse>>, ApiError> {
    let actor = user.actor();
    let scope = complaint_scope(&actor)
        .ok_or_else(|| ApiError::bad_request("user profile is not associated with a supplier or consumer"))?;

    let mut filter = ComplaintFilter {
        consumer_id: query.consumer_id,
        status: query.status,
        level: query.level,
        ..Default::default()
    };
    match scope {
        ComplaintScope::Consumer(consumer_id) => {
            filter.consumer_id = Some(consumer_id);
        }
        ComplaintScope::SupplierLevel(supplier_id, level) => {
            filter.supplier_id = Some(supplier_id);
            filter.scope_level = Some(level);
        }
        ComplaintScope::Supplier(supplier_id) => {
            filter.supplier_id = Some(supplier_id);
        }
    }

    let complaints = ComplaintRepo::new(&state.pool)
        .list(filter, Page::from(PageParams { skip: query.skip, limit: query.limit }))
        .await?;

    Ok(Json(complaints.into_iter().map(ComplaintResponse::from).collect()))
}

/// GET /complaints/{id}
async fn get_complaint(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ComplaintResponse>, ApiError> {
    let complaint = ComplaintRepo::new(&state.pool).get(id).await?;

    if !can_view_complaint(
        &user.actor(),
        complaint.supplier_id,
        complaint.consumer_id,
        complaint.level,
    ) {
        return Err(ApiError::forbidden("access denied"));
    }

    Ok(Json(ComplaintResponse::from(complaint)))
}

/// POST /complaints/{id}/escalate - hand off to a manager (sales rep only)
async fn escalate_complaint(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<EscalateComplaintRequest>,
) -> Result<Json<ComplaintResponse>, ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::SalesRepresentative])?;

    let repo = ComplaintRepo::new(&state.pool);
    let complaint = repo.get(id).await?;

    if actor.supplier_id != Some(complaint.supplier_id) {
        return Err(ApiError::forbidden("access denied"));
    }
    if complaint.level != ComplaintLevel::Sales {
        return Err(ApiError::bad_request("complaint is already escalated"));
    }

    // Target must be an active manager of the same supplier.
    let target = UserRepo::new(&state.pool)
        .find_by_id(req.escalated_to_user_id)
        .await?;
    let is_valid_target = target.as_ref().is_some_and(|t| {
        t.is_active
            && t.role == UserRole::Manager
            && t.supplier_id == Some(complaint.supplier_id)
    });
    if !is_valid_target {
        return Err(ApiError::bad_request(
            "target user must be a manager of the complaint's supplier",
        ));
    }

    // Conditional on the stored level: a concurrent escalation loses here.
    let escalated = repo
        .escalate(id, req.escalated_to_user_id, actor.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("complaint is already escalated"))?;

    Ok(Json(ComplaintResponse::from(escalated)))
}

/// PUT /complaints/{id} - update status/resolution/level (staff only)
async fn update_complaint(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateComplaintRequest>,
) -> Result<Json<ComplaintResponse>, ApiError> {
    let actor = user.actor();
    require_role(
        &actor,
        &[UserRole::SalesRepresentative, UserRole::Manager, UserRole::Owner],
    )?;

    let repo = ComplaintRepo::new(&state.pool);
    let complaint = repo.get(id).await?;

    if !can_view_complaint(&actor, complaint.supplier_id, complaint.consumer_id, complaint.level) {
        return Err(ApiError::forbidden("access denied"));
    }

    // The visibility tier only moves upward.
    if let Some(level) = req.level {
        if level < complaint.level {
            return Err(ApiError::bad_request("complaint level cannot be lowered"));
        }
    }
    let resolution = req
        .resolution
        .map(|r| non_empty_text("resolution", &r))
        .transpose()?;

    let updated = repo
        .update(
            id,
            ComplaintChanges { status: req.status, resolution, level: req.level },
            actor.id,
        )
        .await?;

    Ok(Json(ComplaintResponse::from(updated)))
}

/// Complaint routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/complaints", get(list_complaints).post(create_complaint))
        .route("/complaints/{id}", get(get_complaint).put(update_complaint))
        .route("/complaints/{id}/escalate", post(escalate_complaint))
}
