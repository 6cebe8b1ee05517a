//! ChatTransport trait definition.
//!
//! A transport carries one chat turn to the relay and streams back the raw
//! answer text. The HTTP implementation lives in relaychat-infra; the relay
//! engine itself is a transport for in-process use.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use relaychat_types::chat::ChatTurnRequest;
use relaychat_types::error::TransportError;

use crate::llm::provider::GenerationProvider;
use crate::relay::engine::RelayEngine;

/// Boxed stream of answer text as delivered by the relay.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send + 'static>>;

pub trait ChatTransport: Send + Sync {
    /// Send one turn and stream back the answer text.
    fn send(&self, request: ChatTurnRequest) -> FragmentStream;

    /// Ask the relay to drop whatever it holds for a session.
    fn forget(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

impl<P: GenerationProvider> ChatTransport for RelayEngine<P> {
    fn send(&self, request: ChatTurnRequest) -> FragmentStream {
        Box::pin(self.relay_text(request.into()).map(Ok))
    }

    async fn forget(&self, session_id: &str) -> Result<(), TransportError> {
        self.cache().forget(session_id);
        Ok(())
    }
}
