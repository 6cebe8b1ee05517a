//! Conversation buffer: the client's live copy of one session.
//!
//! Append-only. Every append bumps a revision drawn from a process-wide
//! counter, so revisions of different buffers never collide and "saved at
//! revision N" stays meaningful after switching away and back.

use std::sync::atomic::{AtomicU64, Ordering};

use relaychat_types::chat::{ChatSession, Message, SessionDraft, new_session_id};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    session_id: String,
    messages: Vec<Message>,
    revision: u64,
    /// Revision at which the content was known to match the store.
    clean_revision: u64,
}

impl ConversationBuffer {
    /// A brand-new session holding only the greeting.
    pub fn fresh(greeting: &str) -> Self {
        let revision = next_revision();
        Self {
            session_id: new_session_id(),
            messages: vec![Message::assistant(greeting)],
            revision,
            clean_revision: revision,
        }
    }

    /// A buffer loaded from a stored session; starts clean.
    pub fn from_session(session: &ChatSession) -> Self {
        let revision = next_revision();
        Self {
            session_id: session.id.clone(),
            messages: session.messages.clone(),
            revision,
            clean_revision: revision,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append a message and return the new revision.
    pub fn push(&mut self, message: Message) -> u64 {
        self.messages.push(message);
        self.revision = next_revision();
        self.revision
    }

    /// True until the user has said something. Fresh sessions are never saved.
    pub fn is_fresh(&self) -> bool {
        !self.messages.iter().any(Message::is_user)
    }

    /// Whether there are changes newer than both the load point and
    /// `saved_revision`.
    pub fn is_dirty(&self, saved_revision: Option<u64>) -> bool {
        let clean = saved_revision.unwrap_or(0).max(self.clean_revision);
        self.revision > clean
    }

    /// Snapshot the buffer for saving.
    pub fn draft(&self, owner: &str) -> SessionDraft {
        SessionDraft {
            id: self.session_id.clone(),
            owner: owner.to_string(),
            messages: self.messages.clone(),
            revision: self.revision,
        }
    }
}
