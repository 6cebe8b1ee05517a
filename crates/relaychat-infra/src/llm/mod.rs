//! Upstream generation providers.
//!
//! Concrete implementations of the [`GenerationProvider`] trait defined in
//! `relaychat-core`.
//!
//! [`GenerationProvider`]: relaychat_core::llm::provider::GenerationProvider

pub mod ollama;
