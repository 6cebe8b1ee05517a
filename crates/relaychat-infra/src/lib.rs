//! Infrastructure layer for relaychat.
//!
//! Implementations of the ports defined in `relaychat-core`: the SQLite
//! session repository, the Ollama generation provider, and the HTTP
//! adapters the terminal client uses to reach a relay server. Also loads
//! `config.toml`.

pub mod config;
pub mod llm;
pub mod remote;
pub mod sqlite;
