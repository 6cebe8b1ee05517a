//! HTTP adapters used by the terminal client to reach a relay server.
//!
//! - `HttpSessionStore`: `SessionStore` over the `/api/chat/{load,save,delete}` endpoints
//! - `HttpChatTransport`: `ChatTransport` over the streaming `/api/chat` endpoint

pub mod chat;
pub mod session;

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trim a trailing slash so paths can be appended with `format!`.
fn base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Pull a readable reason out of an error response body: the `error` field
/// of a JSON envelope if present, else the raw text.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
