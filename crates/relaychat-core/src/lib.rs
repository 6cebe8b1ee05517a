//! Chat relay and session logic for relaychat.
//!
//! This crate defines the ports (repository, store, provider and transport
//! traits) that `relaychat-infra` implements, together with the relay engine
//! and the client-side session machinery. It depends only on
//! `relaychat-types`, never on `relaychat-infra` or any database/HTTP crate.

pub mod chat;
pub mod client;
pub mod llm;
pub mod relay;

#[cfg(test)]
mod test_support;
