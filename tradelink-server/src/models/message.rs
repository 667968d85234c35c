//! Chat message composition
//!
//! Both transports (REST and WebSocket) feed raw payloads through
//! `compose_message`, which enforces the content-or-attachment rule,
//! derives the message kind, and resolves receiver and sales-rep fields
//! from the sender's role. Access to the link is checked by the caller
//! before composing.

use serde::Deserialize;

use tradelink_core::{Actor, MessageKind, UserRole};

use super::ValidationError;

/// Maximum length for message content (64KB)
const MAX_CONTENT_LEN: usize = 65536;

/// Raw message payload as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: Option<MessageKind>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub attachment_type: Option<String>,
    /// Explicit target; only honored for consumer senders.
    #[serde(default)]
    pub receiver_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub order_id: Option<i64>,
}

/// Fully resolved message, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub content: String,
    pub kind: MessageKind,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub receiver_id: Option<i64>,
    pub sales_rep_id: Option<i64>,
    pub product_id: Option<i64>,
    pub order_id: Option<i64>,
}

/// Compose a message draft from a raw payload.
///
/// Rules:
/// - content or attachment_url must be non-empty
/// - kind is `Attachment` exactly when attachment_url is set
/// - a consumer sends to the explicit receiver or to no one in
///   particular (any staff); staff send to the link consumer's user
///   account (`consumer_user_id`, resolved by the caller)
/// - `sales_rep_id` is stamped only for sales representatives
pub fn compose_message(
    actor: &Actor,
    input: MessageInput,
    consumer_user_id: Option<i64>,
) -> Result<MessageDraft, ValidationError> {
    let content = input.content.unwrap_or_default();
    let attachment_url = input.attachment_url.filter(|url| !url.is_empty());

    if content.is_empty() && attachment_url.is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "message",
            reason: "either content or attachment_url must be provided",
        });
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(ValidationError::TooLong { field: "content", max: MAX_CONTENT_LEN });
    }

    let kind = match &attachment_url {
        Some(_) => MessageKind::Attachment,
        None => match input.message_type {
            Some(MessageKind::Attachment) => {
                return Err(ValidationError::InvalidFormat {
                    field: "message_type",
                    reason: "attachment messages require an attachment_url",
                });
            }
            Some(kind) => kind,
            None => MessageKind::Text,
        },
    };

    let receiver_id = match actor.role {
        UserRole::Consumer => input.receiver_id,
        _ => consumer_user_id,
    };

    let sales_rep_id = (actor.role == UserRole::SalesRepresentative).then_some(actor.id);

    Ok(MessageDraft {
        content,
        kind,
        attachment_url,
        attachment_type: input.attachment_type,
        receiver_id,
        sales_rep_id,
        product_id: input.product_id,
        order_id: input.order_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer() -> Actor {
        Actor::consumer(1, 10)
    }

    fn rep() -> Actor {
        Actor::staff(2, UserRole::SalesRepresentative, 20)
    }

    fn owner() -> Actor {
        Actor::staff(3, UserRole::Owner, 20)
    }

    fn text_input(content: &str) -> MessageInput {
        MessageInput {
            content: Some(content.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_empty_payload() {
        let err = compose_message(&consumer(), MessageInput::default(), None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { field: "message", .. }));
    }

    #[test]
    fn attachment_overrides_kind() {
        let input = MessageInput {
            attachment_url: Some("https://files.example/receipt.pdf".into()),
            attachment_type: Some("document".into()),
            ..Default::default()
        };
        let draft = compose_message(&consumer(), input, None).unwrap();
        assert_eq!(draft.kind, MessageKind::Attachment);
        assert_eq!(draft.content, "");
    }

    #[test]
    fn attachment_kind_without_url_is_invalid() {
        let input = MessageInput {
            content: Some("hi".into()),
            message_type: Some(MessageKind::Attachment),
            ..Default::default()
        };
        assert!(compose_message(&consumer(), input, None).is_err());
    }

    #[test]
    fn consumer_receiver_is_explicit_or_none() {
        let draft = compose_message(&consumer(), text_input("hello"), Some(99)).unwrap();
        assert_eq!(draft.receiver_id, None);

        let mut input = text_input("hello");
        input.receiver_id = Some(42);
        let draft = compose_message(&consumer(), input, Some(99)).unwrap();
        assert_eq!(draft.receiver_id, Some(42));
        assert_eq!(draft.sales_rep_id, None);
    }

    #[test]
    fn staff_receiver_is_consumer_user() {
        let mut input = text_input("hello");
        // Staff cannot redirect messages away from the consumer.
        input.receiver_id = Some(42);
        let draft = compose_message(&owner(), input, Some(99)).unwrap();
        assert_eq!(draft.receiver_id, Some(99));
        assert_eq!(draft.sales_rep_id, None);
    }

    #[test]
    fn sales_rep_is_stamped() {
        let draft = compose_message(&rep(), text_input("hello"), Some(99)).unwrap();
        assert_eq!(draft.sales_rep_id, Some(2));
        assert_eq!(draft.receiver_id, Some(99));
    }

    #[test]
    fn product_link_kind_passes_through() {
        let mut input = text_input("check this out");
        input.message_type = Some(MessageKind::ProductLink);
        input.product_id = Some(7);
        let draft = compose_message(&consumer(), input, None).unwrap();
        assert_eq!(draft.kind, MessageKind::ProductLink);
        assert_eq!(draft.product_id, Some(7));
    }
}
