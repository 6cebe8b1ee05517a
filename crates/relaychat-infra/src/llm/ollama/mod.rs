//! Ollama generation provider.
//!
//! Streams `/api/chat` responses (NDJSON) and probes `/api/tags` for
//! reachability. The configured URL may point at the bare server or at one
//! of its API endpoints; both forms are accepted.

pub mod streaming;

use std::time::Duration;

use futures_util::StreamExt;
use relaychat_core::llm::provider::{ChunkStream, GenerationProvider};
use relaychat_types::config::UpstreamConfig;
use relaychat_types::error::UpstreamError;
use relaychat_types::llm::{GenerationRequest, ProbeReport};

use self::streaming::decode_ndjson_stream;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Strip a trailing `/api/chat` or `/api/generate` (and slashes) so the
/// configured URL can be used as a base.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let base = trimmed
        .strip_suffix("/api/chat")
        .or_else(|| trimmed.strip_suffix("/api/generate"))
        .unwrap_or(trimmed);
    base.trim_end_matches('/').to_string()
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    /// Build a provider with the configured request and connect timeouts.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn map_request_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Unavailable(format!("request timed out: {err}"))
    } else {
        UpstreamError::Unavailable(err.to_string())
    }
}

impl GenerationProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn stream(&self, mut request: GenerationRequest) -> ChunkStream {
        request.stream = true;
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.base_url);

        Box::pin(async_stream::stream! {
            tracing::debug!(url = %url, model = %request.model, messages = request.messages.len(), "Posting to upstream");

            let response = match client.post(&url).json(&request).send().await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(map_request_error(err));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                yield Err(UpstreamError::Status { status: status.as_u16(), body });
                return;
            }

            let mut chunks = decode_ndjson_stream(response.bytes_stream());
            while let Some(item) = chunks.next().await {
                yield item;
            }
        })
    }

    async fn probe(&self) -> Result<ProbeReport, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(format!("invalid tags response: {e}")))?;

        let models = body["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProbeReport {
            base_url: self.base_url.clone(),
            models,
        })
    }
}
