//! Message endpoints for chat

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tradelink_core::{can_access_link, Actor, LinkStatus, MessageKind, UserRole};

use crate::db::repos::{LinkOverview, LinkRepo, Message, MessageRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::http::server::AppState;
use crate::models::{compose_message, MessageInput, Page, PageParams};

/// Create message request
#[derive(Deserialize)]
pub struct CreateMessageRequest {
    pub link_id: i64,
    #[serde(flatten)]
    pub message: MessageInput,
}

/// Message list query params
#[derive(Deserialize)]
pub struct MessageQuery {
    pub link_id: i64,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Message response
#[derive(Serialize)]
pub struct MessageResponse {
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
    pub read_at: Option<String>,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            link_id: m.link_id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            sales_rep_id: m.sales_rep_id,
            content: m.content,
            message_type: m.message_type,
            attachment_url: m.attachment_url,
            attachment_type: m.attachment_type,
            product_id: m.product_id,
            order_id: m.order_id,
            is_read: m.is_read,
            read_at: m.read_at.map(|t| t.to_rfc3339()),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Reject actors who are neither the link's consumer nor its supplier's
/// staff. Shared with the realtime subscribe path.
pub fn authorize_chat_access(actor: &Actor, link: &LinkOverview) -> Result<(), ApiError> {
    if can_access_link(actor, link.supplier_id, link.consumer_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("access denied"))
    }
}

/// Resolve the consumer-side user account for staff senders; consumers
/// address their messages themselves.
pub async fn resolve_consumer_user(
    state: &AppState,
    actor: &Actor,
    link: &LinkOverview,
) -> Result<Option<i64>, ApiError> {
    if actor.role == UserRole::Consumer {
        Ok(None)
    } else {
        Ok(UserRepo::new(&state.pool)
            .user_id_for_consumer(link.consumer_id)
            .await?)
    }
}

/// POST /messages - send a chat message over an accepted link
async fn create_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let actor = user.actor();
    let link = LinkRepo::new(&state.pool).get(req.link_id).await?;

    authorize_chat_access(&actor, &link)?;
    if link.status != LinkStatus::Accepted {
        return Err(ApiError::forbidden("link must be accepted before sending messages"));
    }

    let consumer_user_id = resolve_consumer_user(&state, &actor, &link).await?;
    let draft = compose_message(&actor, req.message, consumer_user_id)?;

    let message = MessageRepo::new(&state.pool)
        .create(link.id, actor.id, draft)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// GET /messages?link_id= - chronological page of a link's chat
///
/// Listing marks returned messages addressed to the caller as read.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let actor = user.actor();
    let link = LinkRepo::new(&state.pool).get(query.link_id).await?;
    authorize_chat_access(&actor, &link)?;

    let messages = MessageRepo::new(&state.pool)
        .list_for_link(
            link.id,
            actor.id,
            Page::from(PageParams { skip: query.skip, limit: query.limit }),
        )
        .await?;

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// PUT /messages/{id}/read
async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = MessageRepo::new(&state.pool);
    let message = repo.get(id).await?;

    if message.receiver_id != Some(user.id) {
        return Err(ApiError::forbidden(
            "you can only mark your own received messages as read",
        ));
    }

    let updated = repo.mark_read(id).await?;
    Ok(Json(MessageResponse::from(updated)))
}

/// Message routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route("/messages/{id}/read", put(mark_message_read))
}
