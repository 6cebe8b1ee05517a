//! Server-side relay between chat clients and the upstream generator.
//!
//! - `RelayEngine`: forwards a conversation upstream and re-streams fragments
//! - `ConversationCache`: bounded per-session fallback history
//! - `filter_greeting`: strips a lone canned greeting from outgoing context

pub mod cache;
pub mod engine;
pub mod greeting;
