//! Relay engine: forwards a conversation snapshot to the upstream generator
//! and re-streams its fragments as they arrive.
//!
//! Every relay ends with exactly one terminal event. Failures before the
//! first fragment are reported as [`RelayEvent::Failed`]; anything that goes
//! wrong after output has started is reported as a best-effort completion
//! carrying what was accumulated. Fragments are forwarded whole; pacing the
//! reveal is the client's business.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tracing::{debug, info, info_span, warn};

use relaychat_types::chat::{ChatTurnRequest, Message};
use relaychat_types::error::UpstreamError;
use relaychat_types::llm::GenerationRequest;

use crate::llm::provider::GenerationProvider;

use super::cache::ConversationCache;
use super::greeting::filter_greeting;

/// One relay's input: prior history plus the new user prompt.
#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    pub session_id: Option<String>,
    pub history: Vec<Message>,
    pub prompt: String,
}

impl From<ChatTurnRequest> for RelayRequest {
    fn from(request: ChatTurnRequest) -> Self {
        Self {
            session_id: request.session_id,
            history: request.messages,
            prompt: request.prompt,
        }
    }
}

/// Events produced by a relay, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A piece of the answer, forwarded as received.
    Fragment(String),
    /// The answer is complete. `best_effort` is set when the upstream never
    /// signalled completion (connection dropped or errored mid-stream).
    Completed { text: String, best_effort: bool },
    /// Nothing was produced before the upstream failed.
    Failed { error: UpstreamError },
}

impl RelayEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Fragment(_))
    }
}

/// Boxed stream of relay events.
pub type RelayStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send + 'static>>;

/// Boxed stream of client-facing text: fragments, or one `Error: ...` line.
pub type RelayTextStream = Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

/// Relays conversations to a [`GenerationProvider`].
///
/// Stateless per request apart from the shared [`ConversationCache`].
pub struct RelayEngine<P: GenerationProvider> {
    provider: P,
    model: String,
    greeting: String,
    cache: Arc<ConversationCache>,
}

impl<P: GenerationProvider> RelayEngine<P> {
    pub fn new(
        provider: P,
        model: impl Into<String>,
        greeting: impl Into<String>,
        cache: Arc<ConversationCache>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            greeting: greeting.into(),
            cache,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        &self.cache
    }

    /// Start a relay.
    ///
    /// When the request carries no history, the cached conversation for its
    /// session (if any) is used instead. On completion the full conversation
    /// including the answer is recorded in the cache.
    pub fn relay(&self, request: RelayRequest) -> RelayStream {
        let RelayRequest {
            session_id,
            history,
            prompt,
        } = request;

        let history = match (&session_id, history.is_empty()) {
            (Some(id), true) => self.cache.get(id).map(|c| c.messages).unwrap_or_default(),
            _ => history,
        };

        let mut conversation = history;
        conversation.push(Message::user(prompt));
        let outgoing = filter_greeting(&conversation, &self.greeting);

        let span = info_span!(
            "gen_ai.relay",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %self.model,
            session_id = session_id.as_deref().unwrap_or(""),
            messages = outgoing.len(),
        );

        let mut upstream = self.provider.stream(GenerationRequest {
            model: self.model.clone(),
            messages: outgoing,
            stream: true,
        });
        let cache = Arc::clone(&self.cache);

        let events = async_stream::stream! {
            let mut text = String::new();
            let mut fragments = 0usize;
            let mut terminal = None;

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        if !chunk.text_fragment.is_empty() {
                            fragments += 1;
                            text.push_str(&chunk.text_fragment);
                            yield RelayEvent::Fragment(chunk.text_fragment);
                        }
                        if chunk.is_final {
                            terminal = Some(RelayEvent::Completed { text: std::mem::take(&mut text), best_effort: false });
                            break;
                        }
                    }
                    Err(error) if fragments == 0 => {
                        warn!(error = %error, "Upstream failed before producing output");
                        terminal = Some(RelayEvent::Failed { error });
                        break;
                    }
                    Err(error) => {
                        warn!(error = %error, fragments, "Upstream failed mid-stream, keeping partial answer");
                        terminal = Some(RelayEvent::Completed { text: std::mem::take(&mut text), best_effort: true });
                        break;
                    }
                }
            }

            let terminal = match terminal {
                Some(event) => event,
                None if fragments == 0 => RelayEvent::Failed {
                    error: UpstreamError::Unavailable(
                        "upstream closed the stream without output".to_string(),
                    ),
                },
                None => {
                    debug!(fragments, "Upstream closed without a done marker");
                    RelayEvent::Completed { text, best_effort: true }
                }
            };

            if let RelayEvent::Completed { text, best_effort } = &terminal {
                info!(chars = text.chars().count(), fragments, best_effort, "Relay completed");
                if let Some(id) = &session_id {
                    let mut messages = conversation;
                    messages.push(Message::assistant(text.clone()));
                    cache.record(id, None, messages);
                }
            }

            yield terminal;
        };

        Box::pin(StreamInSpan {
            inner: Box::pin(events),
            span,
        })
    }

    /// Start a relay and render it as client-facing text.
    ///
    /// Fragments pass through unchanged; a failure becomes a single
    /// `Error: <message>` fragment.
    pub fn relay_text(&self, request: RelayRequest) -> RelayTextStream {
        Box::pin(self.relay(request).filter_map(|event| async move {
            match event {
                RelayEvent::Fragment(text) => Some(text),
                RelayEvent::Completed { .. } => None,
                RelayEvent::Failed { error } => Some(format!("Error: {error}")),
            }
        }))
    }
}

/// Keeps the relay span entered while the stream is polled.
struct StreamInSpan {
    inner: Pin<Box<dyn Stream<Item = RelayEvent> + Send + 'static>>,
    span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = RelayEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
