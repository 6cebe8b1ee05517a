//! Session title derivation.
//!
//! A title is the first user message cut to 50 characters, with an ellipsis
//! when truncated. Titles are recomputed on every save, never cached.

use relaychat_types::chat::{DEFAULT_TITLE, Message, TITLE_MAX_CHARS};

/// Derive a display title from a session's messages.
///
/// Counts Unicode scalar values, not bytes. Newlines become spaces and the
/// result is trimmed; an empty result falls back to `"New Chat"`.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.is_user()) else {
        return DEFAULT_TITLE.to_string();
    };

    let mut title: String = first.content.chars().take(TITLE_MAX_CHARS).collect();
    if first.content.chars().nth(TITLE_MAX_CHARS).is_some() {
        title.push_str("...");
    }

    let title = title.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let title = title.trim();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}
