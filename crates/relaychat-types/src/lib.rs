//! Shared domain types for relaychat.
//!
//! Messages, sessions, upstream wire records, configuration, and the error
//! taxonomy shared by the relay server and the terminal client.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
