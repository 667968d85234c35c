//! WebSocket event envelopes
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "message", "content": "hello", "attachment_url": null}
//! {"type": "typing", "is_typing": true}
//! {"type": "ping"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "connection", "status": "connected", "link_id": 1, "user_id": 2}
//! {"type": "new_message", "message": {...}}
//! {"type": "typing", "user_id": 2, "link_id": 1, "is_typing": true}
//! {"type": "message_sent", "message_id": 17}
//! {"type": "pong"}
//! {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::db::repos::Message;
use crate::models::MessageInput;

/// Inbound event from a connected client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Message(MessageInput),
    Typing {
        #[serde(default = "default_true")]
        is_typing: bool,
    },
    Ping,
}

fn default_true() -> bool {
    true
}

/// Wire form of a persisted message.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    pub id: i64,
    pub link_id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub sales_rep_id: Option<i64>,
    pub content: String,
    pub message_type: String,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub product_id: Option<i64>,
    pub order_id: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<&Message> for MessagePayload {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            link_id: m.link_id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            sales_rep_id: m.sales_rep_id,
            content: m.content.clone(),
            message_type: m.message_type.as_str().to_owned(),
            attachment_url: m.attachment_url.clone(),
            attachment_type: m.attachment_type.clone(),
            product_id: m.product_id,
            order_id: m.order_id,
            is_read: m.is_read,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Outbound event pushed to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connection {
        status: &'static str,
        link_id: i64,
        user_id: i64,
    },
    NewMessage {
        message: MessagePayload,
    },
    Typing {
        user_id: i64,
        link_id: i64,
        is_typing: bool,
    },
    MessageSent {
        message_id: i64,
    },
    Pong,
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_message_event() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type": "message", "content": "hello"}"#).unwrap();
        match event {
            ClientEvent::Message(input) => {
                assert_eq!(input.content.as_deref(), Some("hello"));
                assert!(input.attachment_url.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_typing_default() {
        let event: ClientEvent = serde_json::from_str(r#"{"type": "typing"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Typing { is_typing: true }));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type": "typing", "is_typing": false}"#).unwrap();
        assert!(matches!(event, ClientEvent::Typing { is_typing: false }));
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type": "subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn server_events_tag_snake_case() {
        let json = serde_json::to_string(&ServerEvent::MessageSent { message_id: 5 }).unwrap();
        assert_eq!(json, r#"{"type":"message_sent","message_id":5}"#);

        let json = serde_json::to_string(&ServerEvent::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn connection_event_shape() {
        let json = serde_json::to_string(&ServerEvent::Connection {
            status: "connected",
            link_id: 3,
            user_id: 9,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"connection","status":"connected","link_id":3,"user_id":9}"#
        );
    }
}
