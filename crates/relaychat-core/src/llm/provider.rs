//! GenerationProvider trait definition.
//!
//! The seam between the relay engine and the upstream inference server.
//! Uses RPITIT for `probe` and `Pin<Box<dyn Stream>>` for `stream` so the
//! returned stream can outlive the borrow of the provider.

use std::pin::Pin;

use futures_util::Stream;

use relaychat_types::error::UpstreamError;
use relaychat_types::llm::{GenerationRequest, ProbeReport, StreamChunk};

/// Boxed stream of upstream chunks.
///
/// Yields fragments in arrival order. A chunk with `is_final` marks the
/// upstream's own end-of-generation signal; the stream may also simply end
/// (connection closed) or yield an error.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, UpstreamError>> + Send + 'static>>;

/// Trait for the upstream generation backend.
///
/// Implementations live in relaychat-infra (e.g., `OllamaProvider`).
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Start a streaming generation for the given conversation.
    fn stream(&self, request: GenerationRequest) -> ChunkStream;

    /// Check that the upstream is reachable and list its models.
    fn probe(&self) -> impl std::future::Future<Output = Result<ProbeReport, UpstreamError>> + Send;
}
