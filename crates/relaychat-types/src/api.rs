//! JSON bodies of the relay server's session endpoints.
//!
//! Request keys are camelCase on the wire. Missing fields deserialize to
//! empty values so handlers can answer with a 400 instead of a parse error.

use serde::{Deserialize, Serialize};

use crate::chat::ChatSession;
use crate::llm::Message;

/// `POST /api/chat/save`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub user_id: String,
}

/// `DELETE /api/chat/delete`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
}

/// `POST /api/chat/clear`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSessionRequest {
    #[serde(default)]
    pub session_id: String,
}

/// Query of `GET /api/chat/load`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionsQuery {
    #[serde(default)]
    pub user_id: String,
}

/// Response of `GET /api/chat/load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSessionsResponse {
    pub chats: Vec<ChatSession>,
    pub success: bool,
}

/// `POST /api/chat/generate-title`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title: String,
    pub success: bool,
}

/// Generic `{success, message}` / `{success, error}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}
