//! Observability setup for relaychat.
//!
//! Structured logging through `tracing-subscriber`, with optional export of
//! relay spans (and their `gen_ai.*` attributes) through OpenTelemetry.

pub mod tracing_setup;
