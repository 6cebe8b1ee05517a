//! Upstream generation abstractions.
//!
//! - `GenerationProvider`: RPITIT trait for the streaming inference backend

pub mod provider;
