//! Ollama NDJSON stream to [`StreamChunk`] adapter.
//!
//! Ollama streams one JSON object per line:
//! `{"message":{"role":"assistant","content":"..."},"done":false}`, ending
//! with a `"done":true` line. Failures mid-stream arrive as `{"error":"..."}`.
//! Network chunks do not align with lines or even with UTF-8 boundaries, so
//! bytes are buffered until a newline is seen.

use std::fmt::Display;

use futures_util::{Stream, StreamExt};
use relaychat_core::llm::provider::ChunkStream;
use relaychat_types::error::UpstreamError;
use relaychat_types::llm::{StreamChunk, StreamRecord};

/// What one decoded line means for the stream.
enum LineOutcome {
    Chunk(StreamChunk),
    Done(StreamChunk),
    Failed(UpstreamError),
    Skip,
}

fn decode_line(line: &[u8]) -> LineOutcome {
    let line = line.trim_ascii();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    let record: StreamRecord = match serde_json::from_slice(line) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(
                error = %err,
                line = %String::from_utf8_lossy(line),
                "Skipping malformed upstream record"
            );
            return LineOutcome::Skip;
        }
    };

    if let Some(error) = record.error {
        return LineOutcome::Failed(UpstreamError::Rejected(error));
    }

    let text = record.message.map(|m| m.content).unwrap_or_default();
    if record.done {
        LineOutcome::Done(StreamChunk::last(text))
    } else if text.is_empty() {
        LineOutcome::Skip
    } else {
        LineOutcome::Chunk(StreamChunk::fragment(text))
    }
}

/// Decode an NDJSON byte stream into [`StreamChunk`]s.
///
/// The returned stream ends after the `done` record, after the first error,
/// or when the byte stream ends. A trailing line without a newline is still
/// decoded.
pub fn decode_ndjson_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut bytes = std::pin::pin!(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(UpstreamError::Unavailable(format!("stream read error: {err}")));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match decode_line(&line) {
                    LineOutcome::Chunk(chunk) => yield Ok(chunk),
                    LineOutcome::Done(chunk) => {
                        yield Ok(chunk);
                        return;
                    }
                    LineOutcome::Failed(err) => {
                        yield Err(err);
                        return;
                    }
                    LineOutcome::Skip => {}
                }
            }
        }

        match decode_line(&buffer) {
            LineOutcome::Chunk(chunk) | LineOutcome::Done(chunk) => yield Ok(chunk),
            LineOutcome::Failed(err) => yield Err(err),
            LineOutcome::Skip => {}
        }
    })
}
