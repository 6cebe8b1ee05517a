//! SessionStore gateway trait.
//!
//! The narrow surface the session lifecycle controller persists through.
//! Implemented in-process by `SessionService` and remotely by the HTTP
//! client adapter in relaychat-infra.

use relaychat_types::chat::{ChatSession, SessionDraft};
use relaychat_types::error::StoreError;

/// Owner-scoped session persistence as seen by a client.
pub trait SessionStore: Send + Sync {
    /// List the owner's sessions, most recently updated first.
    fn list(
        &self,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, StoreError>> + Send;

    /// Upsert a draft. The store derives the title and timestamps.
    fn save(
        &self,
        draft: &SessionDraft,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a session. Deleting a session the owner does not hold is a
    /// silent no-op.
    fn delete(
        &self,
        id: &str,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
