//! Session store gateway orchestrating title derivation, timestamp
//! monotonicity, and the fallback conversation cache.
//!
//! SessionService is the in-process [`SessionStore`]: the relay server puts
//! its HTTP endpoints in front of it, and tests drive it directly.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use relaychat_types::chat::{ChatSession, SessionDraft};
use relaychat_types::error::{RepositoryError, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chat::repository::SessionRepository;
use crate::chat::store::SessionStore;
use crate::chat::title::derive_title;
use crate::relay::cache::ConversationCache;

/// Owner-scoped session persistence over a [`SessionRepository`].
///
/// Generic over the repository to maintain clean architecture
/// (relaychat-core never depends on relaychat-infra).
pub struct SessionService<R: SessionRepository> {
    repo: R,
    cache: Option<Arc<ConversationCache>>,
    // Serializes read-modify-write of `updated_at` across concurrent saves.
    write_lock: Mutex<()>,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            cache: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a service that mirrors saves into `cache` and serves listings
    /// from it while the repository is failing.
    pub fn with_cache(repo: R, cache: Arc<ConversationCache>) -> Self {
        Self {
            repo,
            cache: Some(cache),
            write_lock: Mutex::new(()),
        }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// List an owner's sessions, most recently updated first.
    pub async fn list_sessions(&self, owner: &str) -> Result<Vec<ChatSession>, StoreError> {
        match self.repo.list_sessions(owner).await {
            Ok(sessions) => Ok(sessions),
            Err(err) => match &self.cache {
                Some(cache) => {
                    warn!(owner, error = %err, "Session listing failed, serving cached sessions");
                    Ok(cache.sessions_for(owner))
                }
                None => Err(err.into()),
            },
        }
    }

    /// Get one session if it belongs to `owner`.
    pub async fn get_session(
        &self,
        id: &str,
        owner: &str,
    ) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.repo.get_session(id, owner).await?)
    }

    /// Upsert a draft.
    ///
    /// The title is recomputed from the draft's messages. `created_at` is
    /// kept from the stored row; `updated_at` always moves strictly forward.
    pub async fn save_session(&self, draft: &SessionDraft) -> Result<ChatSession, StoreError> {
        let _guard = self.write_lock.lock().await;

        let previous = self.repo.get_session(&draft.id, &draft.owner).await;
        let previous = match previous {
            Ok(previous) => previous,
            Err(err) => return Err(self.remember_unsaved(draft, err)),
        };

        let now = Utc::now().trunc_subsecs(6);
        let (created_at, updated_at) = match &previous {
            Some(prev) => (prev.created_at, next_updated_at(prev.updated_at, now)),
            None => (now, now),
        };

        let session = ChatSession {
            id: draft.id.clone(),
            owner: draft.owner.clone(),
            messages: draft.messages.clone(),
            title: derive_title(&draft.messages),
            created_at,
            updated_at,
        };

        if let Err(err) = self.repo.upsert_session(&session).await {
            return Err(self.remember_unsaved(draft, err));
        }

        if let Some(cache) = &self.cache {
            cache.record(&session.id, Some(&session.owner), session.messages.clone());
        }

        debug!(
            session_id = %session.id,
            messages = session.messages.len(),
            created = previous.is_none(),
            "Session saved"
        );
        Ok(session)
    }

    /// Delete a session. Returns whether anything owned by `owner` was
    /// removed; a foreign or missing id is not an error.
    pub async fn delete_session(&self, id: &str, owner: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let deleted = self.repo.delete_session(id, owner).await?;
        if let Some(cache) = &self.cache {
            cache.forget_owned(id, owner);
        }
        if deleted {
            info!(session_id = %id, "Session deleted");
        } else {
            debug!(session_id = %id, "Delete matched no session for this owner");
        }
        Ok(deleted)
    }

    fn remember_unsaved(&self, draft: &SessionDraft, err: RepositoryError) -> StoreError {
        let err = StoreError::from(err);
        if let (StoreError::Unavailable(reason), Some(cache)) = (&err, &self.cache) {
            warn!(session_id = %draft.id, reason = %reason, "Save failed, keeping draft in cache");
            cache.record(&draft.id, Some(&draft.owner), draft.messages.clone());
        }
        err
    }
}

impl<R: SessionRepository> SessionStore for SessionService<R> {
    async fn list(&self, owner: &str) -> Result<Vec<ChatSession>, StoreError> {
        self.list_sessions(owner).await
    }

    async fn save(&self, draft: &SessionDraft) -> Result<(), StoreError> {
        self.save_session(draft).await.map(|_| ())
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        self.delete_session(id, owner).await.map(|_| ())
    }
}

/// The next `updated_at` for a session last written at `previous`.
fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}
