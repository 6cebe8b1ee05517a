//! In-memory doubles shared by unit tests across modules.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use relaychat_types::chat::{ChatSession, ChatTurnRequest, SessionDraft};
use relaychat_types::error::{RepositoryError, StoreError, TransportError, UpstreamError};
use relaychat_types::llm::{GenerationRequest, ProbeReport, StreamChunk};
use tokio::sync::mpsc;

use crate::chat::repository::SessionRepository;
use crate::chat::store::SessionStore;
use crate::chat::title::derive_title;
use crate::client::transport::{ChatTransport, FragmentStream};
use crate::llm::provider::{ChunkStream, GenerationProvider};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RepoState {
    sessions: HashMap<String, ChatSession>,
    deleted: HashSet<String>,
    list_failing: bool,
    failing_saves: usize,
}

/// HashMap-backed `SessionRepository` with the same owner and tombstone rules
/// as the SQLite implementation.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<RepoState>>,
}

impl MemoryRepository {
    pub fn set_list_failing(&self, failing: bool) {
        lock(&self.state).list_failing = failing;
    }

    pub fn fail_next_saves(&self, count: usize) {
        lock(&self.state).failing_saves = count;
    }

    pub fn session(&self, id: &str) -> Option<ChatSession> {
        lock(&self.state).sessions.get(id).cloned()
    }
}

impl SessionRepository for MemoryRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let state = lock(&self.state);
        if state.list_failing {
            return Err(RepositoryError::Connection);
        }
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn get_session(
        &self,
        id: &str,
        owner: &str,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(lock(&self.state)
            .sessions
            .get(id)
            .filter(|s| s.owner == owner)
            .cloned())
    }

    async fn upsert_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state);
        if state.failing_saves > 0 {
            state.failing_saves -= 1;
            return Err(RepositoryError::Query("database is locked".to_string()));
        }
        if state.deleted.contains(&session.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(existing) = state.sessions.get(&session.id) {
            if existing.owner != session.owner {
                return Err(RepositoryError::NotFound);
            }
        }
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &str, owner: &str) -> Result<bool, RepositoryError> {
        let mut state = lock(&self.state);
        let owned = state.sessions.get(id).is_some_and(|s| s.owner == owner);
        if owned {
            state.sessions.remove(id);
            state.deleted.insert(id.to_string());
        }
        Ok(owned)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    sessions: HashMap<String, ChatSession>,
    saves: Vec<SessionDraft>,
    deletes: Vec<String>,
    failing_saves: usize,
    rejecting_saves: usize,
    failing_deletes: usize,
    save_delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// `SessionStore` that records every call and can be told to fail or stall.
#[derive(Clone, Default)]
pub struct RecordingStore {
    state: Arc<Mutex<StoreState>>,
}

impl RecordingStore {
    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        let store = Self::default();
        {
            let mut state = lock(&store.state);
            for s in sessions {
                state.sessions.insert(s.id.clone(), s);
            }
        }
        store
    }

    pub fn saves(&self) -> Vec<SessionDraft> {
        lock(&self.state).saves.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        lock(&self.state).deletes.clone()
    }

    pub fn session(&self, id: &str) -> Option<ChatSession> {
        lock(&self.state).sessions.get(id).cloned()
    }

    pub fn fail_next_saves(&self, count: usize) {
        lock(&self.state).failing_saves = count;
    }

    pub fn reject_next_saves(&self, count: usize) {
        lock(&self.state).rejecting_saves = count;
    }

    pub fn fail_next_deletes(&self, count: usize) {
        lock(&self.state).failing_deletes = count;
    }

    pub fn set_save_delay(&self, delay: Duration) {
        lock(&self.state).save_delay = Some(delay);
    }

    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }
}

impl SessionStore for RecordingStore {
    async fn list(&self, owner: &str) -> Result<Vec<ChatSession>, StoreError> {
        let state = lock(&self.state);
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn save(&self, draft: &SessionDraft) -> Result<(), StoreError> {
        let delay = {
            let mut state = lock(&self.state);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.save_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        state.in_flight -= 1;
        state.saves.push(draft.clone());
        if state.failing_saves > 0 {
            state.failing_saves -= 1;
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        if state.rejecting_saves > 0 {
            state.rejecting_saves -= 1;
            return Err(StoreError::Rejected("missing owner".to_string()));
        }
        let now = chrono::Utc::now();
        let created_at = state
            .sessions
            .get(&draft.id)
            .map(|s| s.created_at)
            .unwrap_or(now);
        state.sessions.insert(
            draft.id.clone(),
            ChatSession {
                id: draft.id.clone(),
                owner: draft.owner.clone(),
                title: derive_title(&draft.messages),
                messages: draft.messages.clone(),
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        state.deletes.push(id.to_string());
        if state.sessions.get(id).is_some_and(|s| s.owner == owner) {
            state.sessions.remove(id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

type Script = Vec<Result<StreamChunk, UpstreamError>>;

/// `GenerationProvider` that replays one prepared script per call.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            requests: Arc::default(),
        }
    }

    /// A single generation that streams `fragments` and then finishes.
    pub fn replying(fragments: &[&str]) -> Self {
        let mut script: Script = fragments
            .iter()
            .map(|f| Ok(StreamChunk::fragment(*f)))
            .collect();
        script.push(Ok(StreamChunk::last("")));
        Self::new(vec![script])
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream(&self, request: GenerationRequest) -> ChunkStream {
        lock(&self.requests).push(request);
        let script = lock(&self.scripts).pop_front().unwrap_or_default();
        Box::pin(futures_util::stream::iter(script))
    }

    async fn probe(&self) -> Result<ProbeReport, UpstreamError> {
        Ok(ProbeReport {
            base_url: "scripted://".to_string(),
            models: vec!["test-model".to_string()],
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sender side of one scripted chat turn.
pub type TurnFeed = mpsc::UnboundedSender<Result<String, TransportError>>;

/// `ChatTransport` whose turns are fed by the test through channels.
///
/// Call [`ChannelTransport::expect_turn`] before each submit; dropping the
/// returned sender ends that turn's stream.
#[derive(Clone, Default)]
pub struct ChannelTransport {
    pending: Arc<Mutex<VecDeque<mpsc::UnboundedReceiver<Result<String, TransportError>>>>>,
    requests: Arc<Mutex<Vec<ChatTurnRequest>>>,
    forgotten: Arc<Mutex<Vec<String>>>,
}

impl ChannelTransport {
    pub fn expect_turn(&self) -> TurnFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.pending).push_back(rx);
        tx
    }

    /// Prepare a turn that streams `fragments` and ends.
    pub fn expect_reply(&self, fragments: &[&str]) {
        let feed = self.expect_turn();
        for fragment in fragments {
            let _ = feed.send(Ok(fragment.to_string()));
        }
    }

    pub fn requests(&self) -> Vec<ChatTurnRequest> {
        lock(&self.requests).clone()
    }

    pub fn forgotten(&self) -> Vec<String> {
        lock(&self.forgotten).clone()
    }
}

impl ChatTransport for ChannelTransport {
    fn send(&self, request: ChatTurnRequest) -> FragmentStream {
        lock(&self.requests).push(request);
        match lock(&self.pending).pop_front() {
            Some(mut rx) => Box::pin(async_stream::stream! {
                while let Some(item) = rx.recv().await {
                    yield item;
                }
            }),
            None => Box::pin(futures_util::stream::once(async {
                Err(TransportError::Unreachable("no scripted turn".to_string()))
            })),
        }
    }

    async fn forget(&self, session_id: &str) -> Result<(), TransportError> {
        lock(&self.forgotten).push(session_id.to_string());
        Ok(())
    }
}

/// Drain a fragment stream into a string, stopping at the first error.
pub async fn collect_text(mut stream: FragmentStream) -> String {
    let mut text = String::new();
    while let Some(Ok(fragment)) = stream.next().await {
        text.push_str(&fragment);
    }
    text
}
