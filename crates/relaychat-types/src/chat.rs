//! Chat session types for relaychat.
//!
//! A session is an ordered list of messages owned by one user. The client
//! holds the live copy; the store keeps the last saved snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::llm::{Message, MessageRole};

/// Assistant greeting that opens every fresh session.
pub const DEFAULT_GREETING: &str = "Welcome! How can I help you today?";

/// Title used when a session has no user message yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Maximum number of characters of the first user message kept in a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Generate a fresh session id. Ids are never reused.
pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// A persisted conversation.
///
/// Serialized with snake_case keys; the owner travels as `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub messages: Vec<Message>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }
}

/// What a client submits to be saved.
///
/// The store derives the title and both timestamps; `revision` is the
/// client's buffer revision at snapshot time and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub id: String,
    pub owner: String,
    pub messages: Vec<Message>,
    pub revision: u64,
}

/// One chat turn as sent from client to relay: the new prompt plus the
/// full history that precedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    pub prompt: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_turn_request_wire_keys() {
        let request: ChatTurnRequest = serde_json::from_str(
            r#"{"prompt":"Hello","messages":[{"role":"assistant","content":"Hi"}],"sessionId":"s1"}"#,
        )
        .unwrap();
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.session_id.as_deref(), Some("s1"));

        let bare: ChatTurnRequest = serde_json::from_str(r#"{"prompt":"Hello"}"#).unwrap();
        assert!(bare.messages.is_empty());
        assert!(bare.session_id.is_none());
    }

    fn sample_session() -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: new_session_id(),
            owner: "user-1".to_string(),
            messages: vec![
                Message::assistant(DEFAULT_GREETING),
                Message::user("Hello"),
                Message::assistant("Hi there"),
            ],
            title: "Hello".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_chat_session_uses_snake_case_owner_key() {
        let session = sample_session();
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["user_id"], "user-1");
        assert!(value.get("owner").is_none());
        assert!(value.get("created_at").is_some());
        assert!(value.get("updated_at").is_some());
    }

    #[test]
    fn test_chat_session_serde_roundtrip() {
        let session = sample_session();
        let json = serde_json::to_string(&session).unwrap();
        let parsed: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_user_message_count_ignores_assistant_turns() {
        assert_eq!(sample_session().user_message_count(), 1);
    }

    #[test]
    fn test_new_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
