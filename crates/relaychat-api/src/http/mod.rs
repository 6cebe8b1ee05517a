//! HTTP layer of the relay server.
//!
//! Axum routes under `/api/chat`: a chunked plain-text relay endpoint plus
//! JSON endpoints for session persistence, with CORS and request tracing.

pub mod error;
pub mod handlers;
pub mod router;
