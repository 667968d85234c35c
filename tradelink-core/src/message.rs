//! Chat message kinds

use serde::{Deserialize, Serialize};

/// Kind of a chat message.
///
/// `Attachment` is set exactly when the message carries an attachment
/// URL; `Receipt` and `ProductLink` are structured references to an
/// order or product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Attachment,
    Receipt,
    ProductLink,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Attachment => "attachment",
            Self::Receipt => "receipt",
            Self::ProductLink => "product_link",
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageKind::ProductLink).unwrap(),
            "\"product_link\""
        );
        assert_eq!(serde_json::to_string(&MessageKind::Text).unwrap(), "\"text\"");
    }
}
