// ABOUTME: Chat message types for follow-up questions on an analysis
// ABOUTME: Messages are append-only once created

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A message in the chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub error: bool,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>, error: bool) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            error,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content, false)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content, false)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content, false)
    }

    /// Assistant-side message standing in for a failed reply
    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ChatMessage::assistant_error("Service unavailable");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["error"], true);
    }

    #[test]
    fn test_error_flag_defaults_to_false() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"user","content":"hi","timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!message.error);
        assert_eq!(message.role, MessageRole::User);
    }
}
