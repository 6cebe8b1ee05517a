//! Session lifecycle controller.
//!
//! Owns the active [`ConversationBuffer`] and the client's session listing,
//! runs chat turns through a [`ChatTransport`] and a [`DisplayPacer`], and
//! persists through a [`SaveScheduler`].
//!
//! Consistency rules:
//! - Leaving a session (new, switch) stops the running turn's reveal at once.
//!   An answer that had already been fully revealed is appended; a partial
//!   one is dropped. The session is then saved synchronously if it has
//!   unsaved changes, so the store holds exactly what the user saw.
//! - A turn's answer is applied only if its session is still the active one;
//!   otherwise it is discarded, neither shown nor saved.
//! - A session is removed from the listing only after the store confirmed
//!   its deletion, and no save for it is attempted afterwards.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use relaychat_types::chat::{ChatSession, ChatTurnRequest, DEFAULT_GREETING, Message};
use relaychat_types::error::LifecycleError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::store::SessionStore;
use crate::chat::title::derive_title;

use super::buffer::ConversationBuffer;
use super::pacer::{DisplayPacer, PacerOutcome, SharedTranscript, TranscriptView, TurnId};
use super::saver::{SaveScheduler, SaveStatus};
use super::transport::{ChatTransport, FragmentStream};

/// Shown as the answer when the relay returns no text at all.
const EMPTY_RESPONSE_ERROR: &str = "Error: Received empty response from server. Please try again.";

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Opaque user id from the identity provider.
    pub owner: String,
    pub greeting: String,
    pub debounce: Duration,
    pub reveal_interval: Duration,
}

impl LifecycleConfig {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            greeting: DEFAULT_GREETING.to_string(),
            debounce: Duration::from_millis(300),
            reveal_interval: Duration::from_millis(15),
        }
    }
}

/// Persistence state of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Only the greeting; never persisted.
    Fresh,
    /// Has changes not yet saved.
    Active,
    /// A save for this session is in flight.
    Saving,
    /// Persisted with no pending changes.
    Idle,
}

/// How a turn ended, as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// The answer was fully revealed and appended.
    Completed { turn: TurnId, text: String },
    /// The turn was cancelled or its session was left; nothing was appended.
    Discarded { turn: TurnId },
}

struct TurnResult {
    turn: TurnId,
    session_id: String,
    outcome: PacerOutcome,
}

struct ActiveTurn {
    id: TurnId,
    cancel: CancellationToken,
    task: JoinHandle<TurnResult>,
}

fn lock(view: &SharedTranscript) -> MutexGuard<'_, TranscriptView> {
    view.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct SessionLifecycleController<S: SessionStore + 'static, T: ChatTransport + 'static> {
    config: LifecycleConfig,
    store: Arc<S>,
    transport: Arc<T>,
    buffer: ConversationBuffer,
    sessions: Vec<ChatSession>,
    view: SharedTranscript,
    saver: SaveScheduler,
    turn: Option<ActiveTurn>,
    next_turn: TurnId,
}

impl<S: SessionStore + 'static, T: ChatTransport + 'static> SessionLifecycleController<S, T> {
    /// Create a controller with a fresh session. Must be called within a
    /// tokio runtime (the save scheduler is spawned here).
    pub fn new(config: LifecycleConfig, store: Arc<S>, transport: Arc<T>, view: SharedTranscript) -> Self {
        let saver = SaveScheduler::spawn(Arc::clone(&store), config.debounce);
        let buffer = ConversationBuffer::fresh(&config.greeting);
        Self {
            config,
            store,
            transport,
            buffer,
            sessions: Vec::new(),
            view,
            saver,
            turn: None,
            next_turn: 1,
        }
    }

    pub fn owner(&self) -> &str {
        &self.config.owner
    }

    pub fn active_session_id(&self) -> &str {
        self.buffer.session_id()
    }

    pub fn messages(&self) -> &[Message] {
        self.buffer.messages()
    }

    /// The client's listing, most recently touched first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn view(&self) -> &SharedTranscript {
        &self.view
    }

    pub fn save_status(&self) -> SaveStatus {
        self.saver.status()
    }

    pub fn state(&self) -> LifecycleState {
        if self.buffer.is_fresh() {
            return LifecycleState::Fresh;
        }
        let id = self.buffer.session_id();
        if matches!(self.saver.status(), SaveStatus::Saving { ref session_id } if session_id == id) {
            return LifecycleState::Saving;
        }
        if self.buffer.is_dirty(self.saver.saved_revision(id)) {
            LifecycleState::Active
        } else {
            LifecycleState::Idle
        }
    }

    pub fn is_turn_active(&self) -> bool {
        self.turn.is_some()
    }

    /// Token that cancels the running turn, if any. Useful when the turn is
    /// being awaited and the controller cannot be borrowed.
    pub fn turn_canceller(&self) -> Option<CancellationToken> {
        self.turn.as_ref().map(|t| t.cancel.clone())
    }

    pub fn cancel_turn(&self) {
        if let Some(turn) = &self.turn {
            turn.cancel.cancel();
        }
    }

    /// Reload the listing from the store.
    pub async fn refresh_sessions(&mut self) -> Result<&[ChatSession], LifecycleError> {
        self.sessions = self.store.list(&self.config.owner).await?;
        if !self.buffer.is_fresh() {
            self.sync_active_entry(false);
        }
        debug!(count = self.sessions.len(), "Session listing refreshed");
        Ok(&self.sessions)
    }

    /// Append the prompt and start a turn.
    pub fn submit(&mut self, prompt: &str) -> Result<TurnId, LifecycleError> {
        if prompt.trim().is_empty() {
            return Err(LifecycleError::EmptyPrompt);
        }
        if self.turn.is_some() {
            return Err(LifecycleError::TurnInProgress);
        }

        let history = self.buffer.messages().to_vec();
        self.buffer.push(Message::user(prompt));
        self.schedule_save();

        let turn = self.next_turn;
        self.next_turn += 1;
        let session_id = self.buffer.session_id().to_string();

        let fragments = self.transport.send(ChatTurnRequest {
            prompt: prompt.to_string(),
            messages: history,
            session_id: Some(session_id.clone()),
        });
        let pacer = DisplayPacer::start(turn, Arc::clone(&self.view), self.config.reveal_interval);
        let cancel = pacer.cancellation_token();
        let task = tokio::spawn(feed_turn(turn, session_id.clone(), fragments, pacer));

        info!(turn, session_id = %session_id, "Turn started");
        self.turn = Some(ActiveTurn { id: turn, cancel, task });
        Ok(turn)
    }

    /// Wait for the running turn to end and apply its result.
    pub async fn next_turn_event(&mut self) -> Result<TurnEvent, LifecycleError> {
        let turn = self.turn.take().ok_or(LifecycleError::NoTurn)?;
        match turn.task.await {
            Ok(result) => Ok(self.apply_turn(result)),
            Err(err) => {
                warn!(turn = turn.id, error = %err, "Turn task failed");
                Ok(TurnEvent::Discarded { turn: turn.id })
            }
        }
    }

    /// Submit a prompt and wait for its turn to end.
    pub async fn send(&mut self, prompt: &str) -> Result<TurnEvent, LifecycleError> {
        self.submit(prompt)?;
        self.next_turn_event().await
    }

    /// Leave the current session and start a fresh one. Returns the new id.
    pub async fn new_session(&mut self) -> &str {
        self.leave_current().await;
        self.buffer = ConversationBuffer::fresh(&self.config.greeting);
        info!(session_id = %self.buffer.session_id(), "New session");
        self.buffer.session_id()
    }

    /// Leave the current session and load another one from the listing.
    pub async fn switch_session(&mut self, id: &str) -> Result<(), LifecycleError> {
        if id == self.buffer.session_id() {
            return Ok(());
        }
        let target = self
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownSession(id.to_string()))?;

        self.leave_current().await;
        self.buffer = ConversationBuffer::from_session(&target);
        info!(session_id = %id, messages = target.messages.len(), "Switched session");
        Ok(())
    }

    /// Start over: keep the current conversation saved, open a fresh one,
    /// and ask the relay to forget the old one.
    pub async fn clear_session(&mut self) -> &str {
        let old = self.buffer.session_id().to_string();
        self.new_session().await;
        if let Err(err) = self.transport.forget(&old).await {
            warn!(session_id = %old, error = %err, "Relay did not clear session");
        }
        self.buffer.session_id()
    }

    /// Delete a session from the store, then from the listing.
    ///
    /// Pending saves for it are dropped first. When the active session is
    /// deleted a fresh one takes its place. On failure nothing is removed.
    pub async fn delete_session(&mut self, id: &str) -> Result<(), LifecycleError> {
        let is_active = id == self.buffer.session_id();
        if is_active {
            let _ = self.abandon_turn().await;
        }

        self.saver.discard(id).await;
        if let Err(err) = self.store.delete(id, &self.config.owner).await {
            warn!(session_id = %id, error = %err, "Session delete failed");
            return Err(err.into());
        }

        self.sessions.retain(|s| s.id != id);
        if is_active {
            lock(&self.view).detach();
            self.buffer = ConversationBuffer::fresh(&self.config.greeting);
        }
        info!(session_id = %id, was_active = is_active, "Session deleted");
        Ok(())
    }

    /// Cancel any turn, save what is unsaved, and stop the save scheduler.
    pub async fn shutdown(mut self) {
        self.leave_current().await;
        self.saver.shutdown().await;
    }

    fn apply_turn(&mut self, result: TurnResult) -> TurnEvent {
        let TurnResult {
            turn,
            session_id,
            outcome,
        } = result;

        if session_id != self.buffer.session_id() {
            debug!(turn, session_id = %session_id, "Discarding answer for inactive session");
            return TurnEvent::Discarded { turn };
        }

        match outcome {
            PacerOutcome::Drained(text) => {
                self.buffer.push(Message::assistant(text.clone()));
                self.schedule_save();
                debug!(turn, chars = text.chars().count(), "Turn completed");
                TurnEvent::Completed { turn, text }
            }
            PacerOutcome::Cancelled { revealed } | PacerOutcome::Superseded { revealed } => {
                debug!(turn, revealed = revealed.chars().count(), "Turn discarded");
                TurnEvent::Discarded { turn }
            }
        }
    }

    fn schedule_save(&mut self) {
        if self.buffer.is_fresh() {
            return;
        }
        self.saver.schedule(self.buffer.draft(&self.config.owner));
        self.sync_active_entry(true);
    }

    /// Mirror the active buffer into the listing.
    fn sync_active_entry(&mut self, move_to_front: bool) {
        let now = Utc::now();
        let id = self.buffer.session_id();
        let entry = match self.sessions.iter().position(|s| s.id == id) {
            Some(i) if move_to_front => {
                let mut entry = self.sessions.remove(i);
                entry.updated_at = now;
                self.sessions.insert(0, entry);
                &mut self.sessions[0]
            }
            Some(i) => &mut self.sessions[i],
            None => {
                self.sessions.insert(
                    0,
                    ChatSession {
                        id: id.to_string(),
                        owner: self.config.owner.clone(),
                        messages: Vec::new(),
                        title: String::new(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                &mut self.sessions[0]
            }
        };
        entry.messages = self.buffer.messages().to_vec();
        entry.title = derive_title(&entry.messages);
    }

    /// Stop the running turn and wait for its task. Nothing is revealed
    /// after this starts; a turn whose reveal had already drained still
    /// reports `Drained`.
    async fn abandon_turn(&mut self) -> Option<TurnResult> {
        let turn = self.turn.take()?;
        turn.cancel.cancel();
        lock(&self.view).detach();
        match turn.task.await {
            Ok(result) => {
                debug!(turn = result.turn, "Turn abandoned");
                Some(result)
            }
            Err(err) => {
                warn!(turn = turn.id, error = %err, "Turn task failed");
                None
            }
        }
    }

    async fn leave_current(&mut self) {
        if let Some(result) = self.abandon_turn().await {
            if matches!(result.outcome, PacerOutcome::Drained(_)) {
                self.apply_turn(result);
            }
        }
        lock(&self.view).detach();

        let id = self.buffer.session_id().to_string();
        if !self.buffer.is_fresh() && self.buffer.is_dirty(self.saver.saved_revision(&id)) {
            if let Err(err) = self.saver.flush(self.buffer.draft(&self.config.owner)).await {
                warn!(session_id = %id, error = %err, "Could not save session before leaving it");
            }
        }
    }
}

async fn feed_turn(
    turn: TurnId,
    session_id: String,
    mut fragments: FragmentStream,
    pacer: DisplayPacer,
) -> TurnResult {
    let cancel = pacer.cancellation_token();
    let mut received = 0usize;
    let mut failed = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = fragments.next() => match item {
                Some(Ok(text)) => {
                    received += text.len();
                    pacer.push(&text);
                }
                Some(Err(err)) => {
                    warn!(turn, error = %err, "Chat transport failed");
                    if received == 0 {
                        pacer.push(&format!("Error: {err}. Please try again."));
                    }
                    failed = true;
                    break;
                }
                None => break,
            },
        }
    }
    drop(fragments);

    // A cancelled turn is never marked complete, so it cannot drain.
    if !cancel.is_cancelled() {
        if received == 0 && !failed {
            pacer.push(EMPTY_RESPONSE_ERROR);
        }
        pacer.finish();
    }

    TurnResult {
        turn,
        session_id,
        outcome: pacer.drained().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::service::SessionService;
    use crate::relay::cache::ConversationCache;
    use crate::relay::engine::RelayEngine;
    use crate::test_support::{ChannelTransport, MemoryRepository, RecordingStore, ScriptedProvider};
    use crate::client::pacer::shared_transcript;

    const SETTLE: Duration = Duration::from_secs(2);

    fn config() -> LifecycleConfig {
        LifecycleConfig {
            owner: "alice".to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            debounce: Duration::from_millis(300),
            reveal_interval: Duration::from_millis(1),
        }
    }

    fn controller(
        store: &RecordingStore,
        transport: &ChannelTransport,
    ) -> SessionLifecycleController<RecordingStore, ChannelTransport> {
        SessionLifecycleController::new(
            config(),
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
            shared_transcript(TranscriptView::new()),
        )
    }

    fn stored_session(id: &str, messages: Vec<Message>) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: id.to_string(),
            owner: "alice".to_string(),
            title: derive_title(&messages),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_session_is_never_saved() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let ctl = controller(&store, &transport);

        assert_eq!(ctl.state(), LifecycleState::Fresh);
        assert_eq!(ctl.messages(), &[Message::assistant(DEFAULT_GREETING)]);
        tokio::time::sleep(SETTLE).await;
        assert!(store.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_appends_answer_and_saves_after_debounce() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi", " there"]);
        let mut ctl = controller(&store, &transport);

        let event = ctl.send("Hello").await.unwrap();
        assert!(matches!(event, TurnEvent::Completed { ref text, .. } if text == "Hi there"));
        assert_eq!(
            ctl.messages(),
            &[
                Message::assistant(DEFAULT_GREETING),
                Message::user("Hello"),
                Message::assistant("Hi there"),
            ]
        );
        assert_eq!(ctl.state(), LifecycleState::Active);
        assert_eq!(lock(ctl.view()).text(), "Hi there");

        let request = &transport.requests()[0];
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.messages, vec![Message::assistant(DEFAULT_GREETING)]);
        assert_eq!(request.session_id.as_deref(), Some(ctl.active_session_id()));

        tokio::time::sleep(SETTLE).await;
        assert_eq!(ctl.state(), LifecycleState::Idle);
        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].messages.len(), 3);
        let stored = store.session(ctl.active_session_id()).unwrap();
        assert_eq!(stored.title, "Hello");
        assert_eq!(ctl.sessions()[0].title, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_while_turn_running_is_rejected() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let feed = transport.expect_turn();
        let mut ctl = controller(&store, &transport);

        ctl.submit("Hello").unwrap();
        assert_eq!(ctl.submit("Again"), Err(LifecycleError::TurnInProgress));
        assert_eq!(ctl.submit("   "), Err(LifecycleError::EmptyPrompt));

        feed.send(Ok("done".to_string())).unwrap();
        drop(feed);
        assert!(matches!(ctl.next_turn_event().await.unwrap(), TurnEvent::Completed { .. }));
        assert_eq!(ctl.next_turn_event().await, Err(LifecycleError::NoTurn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_mid_stream_persists_state_at_switch() {
        let other = stored_session("other", vec![Message::user("Earlier"), Message::assistant("Yes")]);
        let store = RecordingStore::with_sessions(vec![other.clone()]);
        let transport = ChannelTransport::default();
        let feed = transport.expect_turn();
        let mut ctl = controller(&store, &transport);
        ctl.refresh_sessions().await.unwrap();

        ctl.submit("Hello").unwrap();
        let first_id = ctl.active_session_id().to_string();
        feed.send(Ok("partial answer".to_string())).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        ctl.switch_session("other").await.unwrap();
        let _ = feed.send(Ok(" that arrives late".to_string()));
        drop(feed);
        tokio::time::sleep(SETTLE).await;

        let expected = vec![Message::assistant(DEFAULT_GREETING), Message::user("Hello")];
        assert_eq!(store.session(&first_id).unwrap().messages, expected);
        assert!(
            store
                .saves()
                .iter()
                .filter(|d| d.id == first_id)
                .all(|d| d.messages == expected)
        );
        assert_eq!(ctl.active_session_id(), "other");
        assert_eq!(ctl.messages(), other.messages.as_slice());
        assert_eq!(ctl.state(), LifecycleState::Idle);
        assert!(!lock(ctl.view()).text().contains("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_for_abandoned_session_is_discarded() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let feed = transport.expect_turn();
        let mut ctl = controller(&store, &transport);

        ctl.submit("Hello").unwrap();
        feed.send(Ok("Hi".to_string())).unwrap();
        let new_id = ctl.new_session().await.to_string();
        drop(feed);

        assert_eq!(ctl.active_session_id(), new_id);
        assert_eq!(ctl.state(), LifecycleState::Fresh);
        assert!(!ctl.is_turn_active());
        assert_eq!(ctl.next_turn_event().await, Err(LifecycleError::NoTurn));
        assert_eq!(ctl.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revealed_answer_is_kept_when_leaving_without_waiting() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi", " there"]);
        let mut ctl = controller(&store, &transport);

        ctl.submit("Hello").unwrap();
        let old_id = ctl.active_session_id().to_string();
        tokio::time::sleep(SETTLE).await;
        assert_eq!(lock(ctl.view()).text(), "Hi there");

        ctl.new_session().await;
        tokio::time::sleep(SETTLE).await;

        let stored = store.session(&old_id).unwrap();
        assert_eq!(stored.messages.last(), Some(&Message::assistant("Hi there")));
        assert_eq!(stored.messages.len(), 3);
        assert_eq!(ctl.state(), LifecycleState::Fresh);
        assert!(!ctl.is_turn_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_stops_before_leaving_save_completes() {
        let store = RecordingStore::default();
        store.set_save_delay(Duration::from_millis(500));
        let transport = ChannelTransport::default();
        let feed = transport.expect_turn();
        let mut ctl = controller(&store, &transport);
        let view = Arc::clone(ctl.view());

        ctl.submit("Hello").unwrap();
        let old_id = ctl.active_session_id().to_string();
        feed.send(Ok("x".repeat(200))).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let before = lock(&view).text().chars().count();
        assert!(before > 0 && before < 200);

        let during = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            lock(&view).text().chars().count()
        };
        let (_, during) = tokio::join!(ctl.new_session(), during);
        drop(feed);

        assert_eq!(during, before);
        assert_eq!(lock(&view).text().chars().count(), before);
        assert_eq!(
            store.session(&old_id).unwrap().messages,
            vec![Message::assistant(DEFAULT_GREETING), Message::user("Hello")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_flushes_dirty_session_immediately() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        let old_id = ctl.active_session_id().to_string();
        let new_id = ctl.new_session().await.to_string();

        assert_ne!(old_id, new_id);
        assert_eq!(store.session(&old_id).unwrap().messages.len(), 3);
        assert_eq!(ctl.state(), LifecycleState::Fresh);

        tokio::time::sleep(SETTLE).await;
        assert_eq!(store.saves().len(), 1, "pending debounce was superseded by the flush");
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_unknown_session_fails() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let mut ctl = controller(&store, &transport);
        assert_eq!(
            ctl.switch_session("nope").await,
            Err(LifecycleError::UnknownSession("nope".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_active_session_starts_fresh() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        tokio::time::sleep(SETTLE).await;
        let id = ctl.active_session_id().to_string();
        assert_eq!(ctl.sessions().len(), 1);

        ctl.delete_session(&id).await.unwrap();
        assert_eq!(store.deletes(), vec![id.clone()]);
        assert!(store.session(&id).is_none());
        assert!(ctl.sessions().is_empty());
        assert_ne!(ctl.active_session_id(), id);
        assert_eq!(ctl.state(), LifecycleState::Fresh);

        tokio::time::sleep(SETTLE).await;
        assert_eq!(store.saves().iter().filter(|d| d.id == id).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_drops_pending_save() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        let id = ctl.active_session_id().to_string();
        ctl.delete_session(&id).await.unwrap();

        tokio::time::sleep(SETTLE).await;
        assert!(store.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_keeps_listing() {
        let store = RecordingStore::with_sessions(vec![stored_session("s1", vec![Message::user("Keep")])]);
        store.fail_next_deletes(1);
        let transport = ChannelTransport::default();
        let mut ctl = controller(&store, &transport);
        ctl.refresh_sessions().await.unwrap();

        let err = ctl.delete_session("s1").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Store(_)));
        assert_eq!(ctl.sessions().len(), 1);
        assert!(store.session("s1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_becomes_assistant_error_message() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let mut ctl = controller(&store, &transport);

        let event = ctl.send("Hello").await.unwrap();
        let expected = "Error: relay unreachable: no scripted turn. Please try again.";
        assert!(matches!(event, TurnEvent::Completed { ref text, .. } if text == expected));
        assert_eq!(ctl.messages().last(), Some(&Message::assistant(expected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_becomes_error_message() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&[]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        assert_eq!(ctl.messages().last(), Some(&Message::assistant(EMPTY_RESPONSE_ERROR)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_turn_appends_nothing() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        let feed = transport.expect_turn();
        let mut ctl = controller(&store, &transport);

        let turn = ctl.submit("Hello").unwrap();
        feed.send(Ok("Hi".to_string())).unwrap();
        ctl.cancel_turn();

        assert_eq!(ctl.next_turn_event().await.unwrap(), TurnEvent::Discarded { turn });
        assert_eq!(ctl.messages().last(), Some(&Message::user("Hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_passes_through_saving() {
        let store = RecordingStore::default();
        store.set_save_delay(Duration::from_millis(500));
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        assert_eq!(ctl.state(), LifecycleState::Active);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(ctl.state(), LifecycleState::Saving);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(ctl.state(), LifecycleState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_session_forgets_relay_copy() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        let old = ctl.active_session_id().to_string();
        ctl.clear_session().await;

        assert_eq!(transport.forgotten(), vec![old.clone()]);
        assert_eq!(ctl.state(), LifecycleState::Fresh);
        assert!(store.session(&old).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_through_relay_and_gateway() {
        let repo = MemoryRepository::default();
        let cache = Arc::new(ConversationCache::new(8));
        let store = Arc::new(SessionService::with_cache(repo, Arc::clone(&cache)));
        let engine = Arc::new(RelayEngine::new(
            ScriptedProvider::replying(&["Hi", " there"]),
            "test-model",
            DEFAULT_GREETING,
            cache,
        ));
        let mut ctl = SessionLifecycleController::new(
            config(),
            Arc::clone(&store),
            engine,
            shared_transcript(TranscriptView::new()),
        );

        let event = ctl.send("Hello").await.unwrap();
        assert!(matches!(event, TurnEvent::Completed { ref text, .. } if text == "Hi there"));
        tokio::time::sleep(SETTLE).await;

        let listed = store.list_sessions("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Hello");
        assert_eq!(listed[0].messages.last(), Some(&Message::assistant("Hi there")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_saves_unsaved_changes() {
        let store = RecordingStore::default();
        let transport = ChannelTransport::default();
        transport.expect_reply(&["Hi"]);
        let mut ctl = controller(&store, &transport);

        ctl.send("Hello").await.unwrap();
        let id = ctl.active_session_id().to_string();
        ctl.shutdown().await;
        assert_eq!(store.session(&id).unwrap().messages.len(), 3);
    }
}
