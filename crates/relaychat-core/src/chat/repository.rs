//! SessionRepository trait definition.
//!
//! Durable CRUD over chat sessions, always scoped by owner. Follows the
//! RPITIT pattern used by every repository port in this crate.

use relaychat_types::chat::ChatSession;
use relaychat_types::error::RepositoryError;

/// Repository trait for chat session persistence.
///
/// Implementations live in relaychat-infra (e.g., `SqliteSessionRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// List an owner's sessions, ordered by `updated_at` DESC.
    fn list_sessions(
        &self,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Get a session by id, only if it belongs to `owner`.
    fn get_session(
        &self,
        id: &str,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Insert or replace a session keyed by id.
    ///
    /// On conflict, `created_at` is preserved. Returns `NotFound` when the id
    /// belongs to a different owner or was previously deleted.
    fn upsert_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session. Returns whether a row owned by `owner` was removed.
    fn delete_session(
        &self,
        id: &str,
        owner: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
