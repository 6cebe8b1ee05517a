//! Generation types for relaychat.
//!
//! These model the conversation messages exchanged with the upstream
//! inference server and the wire records of its NDJSON streaming protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single turn in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// A piece of incrementally generated text. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub text_fragment: String,
    pub is_final: bool,
}

impl StreamChunk {
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            text_fragment: text.into(),
            is_final: false,
        }
    }

    /// Terminal marker; may carry a last fragment.
    pub fn last(text: impl Into<String>) -> Self {
        Self {
            text_fragment: text.into(),
            is_final: true,
        }
    }
}

/// Request body for the upstream `/api/chat` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: bool,
}

/// One NDJSON line emitted by the upstream server.
///
/// Every field is optional on the wire: progress lines carry `message`,
/// the terminal line carries `done: true`, and failures carry `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub message: Option<RecordMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// The `message` object inside a [`StreamRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Result of probing the upstream server for reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub base_url: String,
    pub models: Vec<String>,
}
