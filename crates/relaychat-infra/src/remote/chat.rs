//! `ChatTransport` over the relay server's streaming `/api/chat` endpoint.
//!
//! The response is chunked `text/plain`. Chunk boundaries may fall inside a
//! multi-byte character, so bytes pass through [`Utf8Decoder`] before they
//! are handed on as text.

use futures_util::StreamExt;
use relaychat_core::client::transport::{ChatTransport, FragmentStream};
use relaychat_types::api::ClearSessionRequest;
use relaychat_types::chat::ChatTurnRequest;
use relaychat_types::error::TransportError;

use super::{CONNECT_TIMEOUT, base_url, error_reason};

/// Incremental UTF-8 decoder that holds back an incomplete trailing
/// sequence until the next chunk arrives.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + bytes` as forms complete characters.
    /// Invalid sequences become U+FFFD.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is held back at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatTransport {
    /// No whole-request timeout: an answer streams for as long as the
    /// upstream generates.
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url(server_url),
        })
    }
}

impl ChatTransport for HttpChatTransport {
    fn send(&self, request: ChatTurnRequest) -> FragmentStream {
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.base_url);

        Box::pin(async_stream::stream! {
            let response = match client.post(&url).json(&request).send().await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(TransportError::Unreachable(err.to_string()));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                yield Err(TransportError::Status {
                    status: status.as_u16(),
                    body: error_reason(&body),
                });
                return;
            }

            let mut decoder = Utf8Decoder::default();
            let mut bytes = response.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        let text = decoder.push(&chunk);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(err) => {
                        yield Err(TransportError::Interrupted(err.to_string()));
                        return;
                    }
                }
            }

            let rest = decoder.finish();
            if !rest.is_empty() {
                yield Ok(rest);
            }
        })
    }

    async fn forget(&self, session_id: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(format!("{}/api/chat/clear", self.base_url))
            .json(&ClearSessionRequest {
                session_id: session_id.to_string(),
            })
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: error_reason(&body),
            });
        }
        Ok(())
    }
}
