//! Bounded in-memory conversation cache.
//!
//! Holds the most recent message list per session id so the relay can
//! rebuild context when a client omits its history, and so listings can be
//! served while the durable store is down. Not relied upon for correctness.
//! Eviction is least-recently-used once `capacity` sessions are held.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use lru::LruCache;
use relaychat_types::chat::{ChatSession, Message};

use crate::chat::title::derive_title;

/// A cached conversation snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedConversation {
    /// Known once a save has gone through the gateway; relays alone do not
    /// learn the owner.
    pub owner: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Process-scoped LRU of conversations keyed by session id.
pub struct ConversationCache {
    entries: Mutex<LruCache<String, CachedConversation>>,
}

impl ConversationCache {
    /// Create a cache holding at most `capacity` sessions (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedConversation>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the latest messages for a session.
    ///
    /// An existing owner is kept when `owner` is `None`.
    pub fn record(&self, session_id: &str, owner: Option<&str>, messages: Vec<Message>) {
        let now = Utc::now();
        let mut entries = self.lock();
        match entries.get_mut(session_id) {
            Some(entry) => {
                if let Some(owner) = owner {
                    entry.owner = Some(owner.to_string());
                }
                entry.messages = messages;
                entry.updated_at = now;
            }
            None => {
                entries.put(
                    session_id.to_string(),
                    CachedConversation {
                        owner: owner.map(str::to_string),
                        messages,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }

    /// Look up a session, marking it most recently used.
    pub fn get(&self, session_id: &str) -> Option<CachedConversation> {
        self.lock().get(session_id).cloned()
    }

    /// Drop a session. Returns whether it was present.
    pub fn forget(&self, session_id: &str) -> bool {
        self.lock().pop(session_id).is_some()
    }

    /// Drop a session only if it is not known to belong to someone else.
    pub fn forget_owned(&self, session_id: &str, owner: &str) -> bool {
        let mut entries = self.lock();
        let owned = entries
            .peek(session_id)
            .is_some_and(|e| e.owner.as_deref().is_none_or(|o| o == owner));
        owned && entries.pop(session_id).is_some()
    }

    /// Sessions known to belong to `owner`, most recently updated first.
    pub fn sessions_for(&self, owner: &str) -> Vec<ChatSession> {
        let entries = self.lock();
        let mut sessions: Vec<ChatSession> = entries
            .iter()
            .filter(|(_, e)| e.owner.as_deref() == Some(owner))
            .map(|(id, e)| ChatSession {
                id: id.clone(),
                owner: owner.to_string(),
                title: derive_title(&e.messages),
                messages: e.messages.clone(),
                created_at: e.created_at,
                updated_at: e.updated_at,
            })
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let cache = ConversationCache::new(4);
        cache.record("s1", None, vec![Message::user("Hello")]);
        let entry = cache.get("s1").unwrap();
        assert_eq!(entry.messages, vec![Message::user("Hello")]);
        assert!(entry.owner.is_none());
    }

    #[test]
    fn test_record_keeps_known_owner() {
        let cache = ConversationCache::new(4);
        cache.record("s1", Some("alice"), vec![Message::user("Hello")]);
        cache.record(
            "s1",
            None,
            vec![Message::user("Hello"), Message::assistant("Hi")],
        );
        let entry = cache.get("s1").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("alice"));
        assert_eq!(entry.messages.len(), 2);
    }

    #[test]
    fn test_least_recently_used_entry_is_evicted() {
        let cache = ConversationCache::new(2);
        cache.record("a", None, vec![]);
        cache.record("b", None, vec![]);
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.record("c", None, vec![]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_zero_capacity_still_holds_one_entry() {
        let cache = ConversationCache::new(0);
        cache.record("a", None, vec![]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_forget() {
        let cache = ConversationCache::new(2);
        cache.record("a", None, vec![]);
        assert!(cache.forget("a"));
        assert!(!cache.forget("a"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget_owned_respects_owner() {
        let cache = ConversationCache::new(4);
        cache.record("a", Some("alice"), vec![]);
        cache.record("b", None, vec![]);
        assert!(!cache.forget_owned("a", "mallory"));
        assert!(cache.get("a").is_some());
        assert!(cache.forget_owned("a", "alice"));
        assert!(cache.forget_owned("b", "mallory"));
    }

    #[test]
    fn test_sessions_for_filters_by_owner() {
        let cache = ConversationCache::new(4);
        cache.record("a", Some("alice"), vec![Message::user("First")]);
        cache.record("b", Some("bob"), vec![Message::user("Other")]);
        cache.record("c", Some("alice"), vec![Message::user("Second")]);

        let sessions = cache.sessions_for("alice");
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.owner == "alice"));
        assert!(sessions[0].updated_at >= sessions[1].updated_at);
        assert!(sessions.iter().any(|s| s.title == "First"));
    }
}
