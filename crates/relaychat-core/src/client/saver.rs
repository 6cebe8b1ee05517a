//! Debounced, sequential session persistence.
//!
//! A single actor task owns all saves for one controller. Scheduling a draft
//! (re)arms a debounce deadline for its session; only the latest draft per
//! session is kept. Saves are awaited one at a time, so a session never has
//! two saves in flight and a later draft can never be overwritten by an
//! earlier one.
//!
//! A save that fails with `StoreError::Unavailable` is re-armed once; a
//! second failure is reported through [`SaveStatus::Failed`] and left for the
//! next trigger to retry with fresh content. A `StoreError::Rejected` save
//! is reported at once and never retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use relaychat_types::chat::SessionDraft;
use relaychat_types::error::StoreError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::chat::store::SessionStore;

/// Persistence indicator for the UI. Never blocks interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// At least one save is waiting for its debounce deadline.
    Pending,
    /// A save is in flight for this session.
    Saving { session_id: String },
    /// The last attempt for this session failed after its retry.
    Failed { session_id: String, error: StoreError },
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SaverState {
    pub status: SaveStatus,
    /// Highest revision successfully saved, per session.
    pub saved: HashMap<String, u64>,
}

enum SaveCommand {
    Schedule(SessionDraft),
    Flush(SessionDraft, oneshot::Sender<Result<(), StoreError>>),
    Discard(String, oneshot::Sender<()>),
}

struct PendingSave {
    draft: SessionDraft,
    deadline: Instant,
    retried: bool,
}

/// Handle to the save actor.
pub struct SaveScheduler {
    commands: mpsc::UnboundedSender<SaveCommand>,
    state: watch::Receiver<SaverState>,
    task: JoinHandle<()>,
}

impl SaveScheduler {
    pub fn spawn<S: SessionStore + 'static>(store: Arc<S>, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SaverState::default());
        let task = tokio::spawn(run(store, rx, state_tx, debounce));
        Self {
            commands,
            state,
            task,
        }
    }

    /// Save `draft` once no newer draft for its session arrives within the
    /// debounce window.
    pub fn schedule(&self, draft: SessionDraft) {
        if self.commands.send(SaveCommand::Schedule(draft)).is_err() {
            warn!("Save scheduler stopped, dropping scheduled save");
        }
    }

    /// Save `draft` now, superseding any pending draft for its session.
    pub async fn flush(&self, draft: SessionDraft) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SaveCommand::Flush(draft, reply))
            .map_err(|_| StoreError::Unavailable("save scheduler stopped".to_string()))?;
        rx.await
            .map_err(|_| StoreError::Unavailable("save scheduler stopped".to_string()))?
    }

    /// Drop any pending save for a session. Returns after any in-flight save
    /// has finished, so nothing for this session is written afterwards.
    pub async fn discard(&self, session_id: &str) {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SaveCommand::Discard(session_id.to_string(), reply))
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.state.borrow().status.clone()
    }

    pub fn saved_revision(&self, session_id: &str) -> Option<u64> {
        self.state.borrow().saved.get(session_id).copied()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<SaverState> {
        self.state.clone()
    }

    /// Stop accepting work, write every pending draft, and wait for the actor.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            warn!(error = %err, "Save scheduler task failed");
        }
    }
}

async fn run<S: SessionStore>(
    store: Arc<S>,
    mut commands: mpsc::UnboundedReceiver<SaveCommand>,
    state: watch::Sender<SaverState>,
    debounce: Duration,
) {
    let mut pending: HashMap<String, PendingSave> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();

        tokio::select! {
            command = commands.recv() => match command {
                Some(SaveCommand::Schedule(draft)) => {
                    debug!(session_id = %draft.id, revision = draft.revision, "Save scheduled");
                    pending.insert(draft.id.clone(), PendingSave {
                        draft,
                        deadline: Instant::now() + debounce,
                        retried: false,
                    });
                    publish_status(&state, &pending, None);
                }
                Some(SaveCommand::Flush(draft, reply)) => {
                    pending.remove(&draft.id);
                    let result = save_one(store.as_ref(), &state, &pending, &draft).await;
                    if let Err(StoreError::Unavailable(_)) = &result {
                        pending.insert(draft.id.clone(), PendingSave {
                            draft,
                            deadline: Instant::now() + debounce,
                            retried: true,
                        });
                        publish_status(&state, &pending, None);
                    }
                    let _ = reply.send(result);
                }
                Some(SaveCommand::Discard(session_id, reply)) => {
                    if pending.remove(&session_id).is_some() {
                        debug!(session_id = %session_id, "Pending save discarded");
                    }
                    state.send_modify(|s| {
                        s.saved.remove(&session_id);
                    });
                    publish_status(&state, &pending, None);
                    let _ = reply.send(());
                }
                None => break,
            },
            _ = sleep_until(next_deadline), if next_deadline.is_some() => {
                let now = Instant::now();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, p)| p.deadline <= now)
                    .map(|(id, _)| id.clone())
                    .collect();

                for id in due {
                    let Some(entry) = pending.remove(&id) else { continue };
                    let result = save_one(store.as_ref(), &state, &pending, &entry.draft).await;
                    match result {
                        Err(StoreError::Unavailable(reason)) if !entry.retried => {
                            warn!(session_id = %id, reason = %reason, "Save failed, retrying after debounce");
                            pending.insert(id, PendingSave {
                                draft: entry.draft,
                                deadline: Instant::now() + debounce,
                                retried: true,
                            });
                            publish_status(&state, &pending, None);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    // Channel closed: write whatever is still waiting.
    let leftovers: Vec<PendingSave> = pending.drain().map(|(_, p)| p).collect();
    for entry in leftovers {
        let _ = save_one(store.as_ref(), &state, &pending, &entry.draft).await;
    }
}

async fn save_one<S: SessionStore>(
    store: &S,
    state: &watch::Sender<SaverState>,
    pending: &HashMap<String, PendingSave>,
    draft: &SessionDraft,
) -> Result<(), StoreError> {
    state.send_modify(|s| {
        s.status = SaveStatus::Saving {
            session_id: draft.id.clone(),
        };
    });

    let result = store.save(draft).await;
    match &result {
        Ok(()) => {
            debug!(session_id = %draft.id, revision = draft.revision, "Session persisted");
            state.send_modify(|s| {
                let saved = s.saved.entry(draft.id.clone()).or_insert(0);
                *saved = (*saved).max(draft.revision);
            });
            publish_status(state, pending, None);
        }
        Err(err) => {
            warn!(session_id = %draft.id, error = %err, "Session save failed");
            publish_status(state, pending, Some((draft.id.clone(), err.clone())));
        }
    }
    result
}

fn publish_status(
    state: &watch::Sender<SaverState>,
    pending: &HashMap<String, PendingSave>,
    failure: Option<(String, StoreError)>,
) {
    state.send_modify(|s| {
        s.status = match failure {
            Some((session_id, error)) => SaveStatus::Failed { session_id, error },
            None if !pending.is_empty() => SaveStatus::Pending,
            None => match &s.status {
                // Keep a failure visible until something new happens.
                SaveStatus::Failed { session_id, .. } if !s.saved.contains_key(session_id) => {
                    s.status.clone()
                }
                _ => SaveStatus::Idle,
            },
        };
    });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
