//! WebSocket endpoint for realtime chat
//!
//! Connection lifecycle: authenticate the `?token=` credential, verify
//! the link and the caller's access to it, then subscribe the
//! connection in the chat registry. Any failure before that point - and
//! any authorization failure afterwards - closes the socket with a
//! policy-violation code. Malformed in-session events only produce an
//! in-band `error` event.
//!
//! Persistence goes through the same composition and repository path as
//! `POST /messages`; subscribers are notified only after the row is
//! durable.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use tradelink_core::{Actor, LinkStatus};

use crate::db::repos::{LinkOverview, LinkRepo, MessageRepo, UserRepo};
use crate::http::server::AppState;
use crate::models::compose_message;
use crate::realtime::registry::CONNECTION_QUEUE_DEPTH;
use crate::realtime::{ClientEvent, MessagePayload, ServerEvent};

use super::messages::resolve_consumer_user;

/// A connection with no inbound frame for this long is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// GET /ws/chat/{link_id}?token= - WebSocket upgrade
async fn ws_chat(
    ws: WebSocketUpgrade,
    Path(link_id): Path<i64>,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, link_id, query.token))
}

/// Outcome of one inbound event.
enum Flow {
    Continue,
    Close(Option<&'static str>),
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    link_id: i64,
    token: Option<String>,
) {
    let actor = match authorize(&state, link_id, token.as_deref()).await {
        Ok(actor) => actor,
        Err(reason) => {
            close_with_policy_violation(&mut socket, reason).await;
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The registry holds the only sender: when the entry is removed
    // (reconnect replacement or process shutdown), the channel drains
    // and the loop below ends.
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(CONNECTION_QUEUE_DEPTH);
    state.registry.subscribe(actor.id, link_id, tx);
    tracing::info!(user_id = actor.id, link_id, "chat connection opened");

    state.registry.send_to(
        actor.id,
        link_id,
        ServerEvent::Connection { status: "connected", link_id, user_id: actor.id },
    );

    let mut deadline = Instant::now() + IDLE_TIMEOUT;
    loop {
        tokio::select! {
            outbound = rx.recv() => {
                // None means the registry dropped this connection
                // (replaced by a reconnect, or process shutdown).
                let Some(event) = outbound else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            inbound = ws_receiver.next() => {
                deadline = Instant::now() + IDLE_TIMEOUT;
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match handle_event(&state, &actor, link_id, &text).await {
                            Flow::Continue => {}
                            Flow::Close(reason) => {
                                if let Some(reason) = reason {
                                    let frame = CloseFrame {
                                        code: close_code::POLICY,
                                        reason: reason.into(),
                                    };
                                    let _ = ws_sender.send(WsMessage::Close(Some(frame))).await;
                                }
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong handled by the protocol layer
                    Some(Err(e)) => {
                        tracing::debug!(user_id = actor.id, link_id, error = %e, "chat connection error");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::info!(user_id = actor.id, link_id, "closing idle chat connection");
                break;
            }
        }
    }

    state.registry.unsubscribe(actor.id, link_id);
    tracing::info!(user_id = actor.id, link_id, "chat connection closed");
}

/// Resolve the credential and verify the subscription preconditions:
/// the link exists, the actor may access it, and it is accepted.
async fn authorize(
    state: &AppState,
    link_id: i64,
    token: Option<&str>,
) -> Result<Actor, &'static str> {
    let Some(token) = token else {
        return Err("token required");
    };
    let user = UserRepo::new(&state.pool)
        .find_by_token(token)
        .await
        .map_err(|_| "authentication failed")?
        .ok_or("authentication failed")?;
    let actor = user.actor();

    let link = LinkRepo::new(&state.pool)
        .get(link_id)
        .await
        .map_err(|_| "link not found")?;
    check_chat_access(&actor, &link)?;
    Ok(actor)
}

fn check_chat_access(actor: &Actor, link: &LinkOverview) -> Result<(), &'static str> {
    if !tradelink_core::can_access_link(actor, link.supplier_id, link.consumer_id) {
        return Err("access denied");
    }
    if link.status != LinkStatus::Accepted {
        return Err("link is not accepted");
    }
    Ok(())
}

/// Handle one inbound event. Authorization failures close the
/// connection; malformed payloads degrade to an in-band error event.
async fn handle_event(state: &Arc<AppState>, actor: &Actor, link_id: i64, text: &str) -> Flow {
    let reply = |event: ServerEvent| state.registry.send_to(actor.id, link_id, event);

    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            reply(ServerEvent::error(format!("unrecognized event: {e}")));
            return Flow::Continue;
        }
    };

    match event {
        ClientEvent::Ping => {
            reply(ServerEvent::Pong);
            Flow::Continue
        }
        ClientEvent::Typing { is_typing } => {
            state.registry.broadcast_to_link(
                link_id,
                &ServerEvent::Typing { user_id: actor.id, link_id, is_typing },
                Some(actor.id),
            );
            Flow::Continue
        }
        ClientEvent::Message(input) => {
            // Link acceptance is rechecked on every post, exactly as on
            // the REST path; a link that got removed or blocked since
            // subscribing ends the session.
            let link = match LinkRepo::new(&state.pool).get(link_id).await {
                Ok(link) => link,
                Err(e) => {
                    tracing::warn!(link_id, error = %e, "chat link lookup failed");
                    return Flow::Close(Some("link not found"));
                }
            };
            if let Err(reason) = check_chat_access(actor, &link) {
                return Flow::Close(Some(reason));
            }

            let consumer_user_id = match resolve_consumer_user(state, actor, &link).await {
                Ok(id) => id,
                Err(_) => return Flow::Close(None),
            };
            let draft = match compose_message(actor, input, consumer_user_id) {
                Ok(draft) => draft,
                Err(e) => {
                    reply(ServerEvent::error(e.to_string()));
                    return Flow::Continue;
                }
            };

            let message = match MessageRepo::new(&state.pool).create(link_id, actor.id, draft).await
            {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(link_id, error = %e, "failed to persist chat message");
                    return Flow::Close(None);
                }
            };

            // Broadcast only after the insert committed.
            state.registry.broadcast_to_link(
                link_id,
                &ServerEvent::NewMessage { message: MessagePayload::from(&message) },
                Some(actor.id),
            );
            reply(ServerEvent::MessageSent { message_id: message.id });
            Flow::Continue
        }
    }
}

async fn close_with_policy_violation(socket: &mut WebSocket, reason: &'static str) {
    let frame = CloseFrame { code: close_code::POLICY, reason: reason.into() };
    let _ = socket.send(WsMessage::Close(Some(frame))).await;
}

/// WebSocket routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/chat/{link_id}", get(ws_chat))
}
