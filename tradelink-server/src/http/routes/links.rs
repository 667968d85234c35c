//! Link endpoints - supplier-consumer relationships

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tradelink_core::{can_access_link, require_role, LinkStatus, UserRole};

use crate::db::repos::{Link, LinkFilter, LinkOverview, LinkRepo, NewLink};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::models::{Page, PageParams};

/// Create link request
#[derive(Deserialize)]
pub struct CreateLinkRequest {
    pub supplier_id: i64,
    pub consumer_id: i64,
    pub request_message: Option<String>,
}

/// Update link request
#[derive(Deserialize)]
pub struct UpdateLinkRequest {
    pub status: Option<LinkStatus>,
}

/// Link list query params
#[derive(Deserialize, Default)]
pub struct LinkQuery {
    pub supplier_id: Option<i64>,
    pub consumer_id: Option<i64>,
    pub status: Option<LinkStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Link response
#[derive(Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub supplier_id: i64,
    pub consumer_id: i64,
    pub status: LinkStatus,
    pub requested_by_consumer: bool,
    pub request_message: Option<String>,
    pub assigned_sales_rep_id: Option<i64>,
    pub requested_at: String,
    pub responded_at: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub has_active_complaint: Option<bool>,
}

impl From<Link> for LinkResponse {
    fn from(l: Link) -> Self {
        Self {
            id: l.id,
            supplier_id: l.supplier_id,
            consumer_id: l.consumer_id,
            status: l.status,
            requested_by_consumer: l.requested_by_consumer,
            request_message: l.request_message,
            assigned_sales_rep_id: l.assigned_sales_rep_id,
            requested_at: l.requested_at.to_rfc3339(),
            responded_at: l.responded_at.map(|t| t.to_rfc3339()),
            created_at: l.created_at.to_rfc3339(),
            updated_at: l.updated_at.map(|t| t.to_rfc3339()),
            has_active_complaint: None,
        }
    }
}

impl From<LinkOverview> for LinkResponse {
    fn from(l: LinkOverview) -> Self {
        Self {
            id: l.id,
            supplier_id: l.supplier_id,
            consumer_id: l.consumer_id,
            status: l.status,
            requested_by_consumer: l.requested_by_consumer,
            request_message: l.request_message,
            assigned_sales_rep_id: l.assigned_sales_rep_id,
            requested_at: l.requested_at.to_rfc3339(),
            responded_at: l.responded_at.map(|t| t.to_rfc3339()),
            created_at: l.created_at.to_rfc3339(),
            updated_at: l.updated_at.map(|t| t.to_rfc3339()),
            has_active_complaint: Some(l.has_active_complaint),
        }
    }
}

const SUPPLIER_STAFF: &[UserRole] =
    &[UserRole::Owner, UserRole::Manager, UserRole::SalesRepresentative];

/// POST /links - request a link (either party)
async fn create_link(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    let link = LinkRepo::new(&state.pool)
        .create(NewLink {
            supplier_id: req.supplier_id,
            consumer_id: req.consumer_id,
            request_message: req.request_message,
            requested_by_consumer: user.role == UserRole::Consumer,
        })
        .await?
        .ok_or_else(|| {
            ApiError::conflict("link already exists between these supplier and consumer")
        })?;

    Ok((StatusCode::CREATED, Json(LinkResponse::from(link))))
}

/// GET /links - role-scoped link listing with complaint flags
async fn list_links(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LinkQuery>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let actor = user.actor();
    let filter = match actor.role {
        UserRole::Consumer => {
            let consumer_id = actor
                .consumer_id
                .ok_or_else(|| ApiError::bad_request("consumer profile not found"))?;
            LinkFilter {
                supplier_id: query.supplier_id,
                consumer_id: Some(consumer_id),
                status: query.status,
            }
        }
        _ => {
            let supplier_id = actor
                .supplier_id
                .ok_or_else(|| ApiError::bad_request("user must be associated with a supplier"))?;
            LinkFilter {
                supplier_id: Some(supplier_id),
                consumer_id: query.consumer_id,
                status: query.status,
            }
        }
    };

    let links = LinkRepo::new(&state.pool)
        .list(filter, Page::from(PageParams { skip: query.skip, limit: query.limit }))
        .await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// GET /links/{id}
async fn get_link(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LinkResponse>, ApiError> {
    let link = LinkRepo::new(&state.pool).get(id).await?;

    if !can_access_link(&user.actor(), link.supplier_id, link.consumer_id) {
        return Err(ApiError::forbidden("access denied"));
    }

    Ok(Json(LinkResponse::from(link)))
}

/// PUT /links/{id} - approve/reject/block (supplier staff only)
async fn update_link(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, ApiError> {
    let repo = LinkRepo::new(&state.pool);
    let link = repo.get(id).await?;
    let actor = user.actor();

    let new_status = match req.status {
        Some(status) if status != link.status => status,
        _ => return Ok(Json(LinkResponse::from(link))),
    };

    require_role(&actor, SUPPLIER_STAFF)?;
    if actor.supplier_id != Some(link.supplier_id) {
        return Err(ApiError::forbidden(
            "you can only approve/reject links for your own supplier",
        ));
    }
    if !link.status.can_transition(new_status) {
        return Err(ApiError::bad_request(format!(
            "cannot move link from {} to {}",
            link.status, new_status
        )));
    }

    let updated = repo
        .set_status(id, link.status, new_status)
        .await?
        .ok_or_else(|| ApiError::bad_request("link status changed concurrently"))?;

    Ok(Json(LinkResponse::from(updated)))
}

/// POST /links/{id}/assign - claim the chat (sales rep only)
async fn assign_chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LinkResponse>, ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::SalesRepresentative])?;

    let repo = LinkRepo::new(&state.pool);
    let link = repo.get(id).await?;
    if actor.supplier_id != Some(link.supplier_id) {
        return Err(ApiError::forbidden(
            "you can only assign chats from your own supplier",
        ));
    }

    let updated = repo
        .assign(id, actor.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("can only assign accepted links"))?;

    Ok(Json(LinkResponse::from(updated)))
}

/// POST /links/{id}/unassign - release the chat
async fn unassign_chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<LinkResponse>, ApiError> {
    let actor = user.actor();
    require_role(&actor, SUPPLIER_STAFF)?;

    let repo = LinkRepo::new(&state.pool);
    let link = repo.get(id).await?;
    if actor.supplier_id != Some(link.supplier_id) {
        return Err(ApiError::forbidden(
            "you can only unassign chats from your own supplier",
        ));
    }
    // A sales rep may only release their own assignment.
    if actor.role == UserRole::SalesRepresentative
        && link.assigned_sales_rep_id != Some(actor.id)
    {
        return Err(ApiError::forbidden("you can only unassign chats assigned to you"));
    }

    let updated = repo.unassign(id).await?;
    Ok(Json(LinkResponse::from(updated)))
}

/// GET /links/chats/my - chats assigned to the current sales rep
async fn my_chats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::SalesRepresentative])?;
    let supplier_id = actor
        .supplier_id
        .ok_or_else(|| ApiError::bad_request("sales representative must be associated with a supplier"))?;

    let links = LinkRepo::new(&state.pool)
        .assigned_to(supplier_id, actor.id, Page::from(params))
        .await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// GET /links/chats/other - same supplier, unassigned or someone else's
async fn other_chats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::SalesRepresentative])?;
    let supplier_id = actor
        .supplier_id
        .ok_or_else(|| ApiError::bad_request("sales representative must be associated with a supplier"))?;

    let links = LinkRepo::new(&state.pool)
        .unassigned_or_other(supplier_id, actor.id, Page::from(params))
        .await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// GET /links/chats/consumer - all accepted chats for the consumer
async fn consumer_chats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let actor = user.actor();
    require_role(&actor, &[UserRole::Consumer])?;
    let consumer_id = actor
        .consumer_id
        .ok_or_else(|| ApiError::bad_request("consumer profile not found"))?;

    let links = LinkRepo::new(&state.pool)
        .accepted_for_consumer(consumer_id, Page::from(params))
        .await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// Link routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/links", get(list_links).post(create_link))
        .route("/links/chats/my", get(my_chats))
        .route("/links/chats/other", get(other_chats))
        .route("/links/chats/consumer", get(consumer_chats))
        .route("/links/{id}", get(get_link).put(update_link))
        .route("/links/{id}/assign", post(assign_chat))
        .route("/links/{id}/unassign", post(unassign_chat))
}
