//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `relaychat-core` with raw sqlx queries,
//! a private Row struct, and the split reader/writer pool. Messages are kept
//! as a JSON array in one column; a session is always read and written whole.

use chrono::{DateTime, SecondsFormat, Utc};
use relaychat_core::chat::repository::SessionRepository;
use relaychat_types::chat::{ChatSession, Message};
use relaychat_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    owner: String,
    title: String,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            title: row.try_get("title")?,
            messages: row.try_get("messages")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let messages: Vec<Message> = serde_json::from_str(&self.messages).map_err(|e| {
            RepositoryError::Query(format!("invalid messages for session {}: {e}", self.id))
        })?;

        Ok(ChatSession {
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            id: self.id,
            owner: self.owner,
            title: self.title,
            messages,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so `ORDER BY updated_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_sessions WHERE owner = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row = SessionRow::from_row(row).map_err(query_error)?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
    }

    async fn get_session(
        &self,
        id: &str,
        owner: &str,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ? AND owner = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row).map_err(query_error)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let messages = serde_json::to_string(&session.messages)
            .map_err(|e| RepositoryError::Query(format!("failed to encode messages: {e}")))?;

        // The SELECT form lets one statement refuse tombstoned ids; the
        // conflict WHERE refuses rows held by another owner.
        let result = sqlx::query(
            r#"INSERT INTO chat_sessions (id, owner, title, messages, created_at, updated_at)
               SELECT ?, ?, ?, ?, ?, ?
               WHERE NOT EXISTS (SELECT 1 FROM deleted_sessions WHERE id = ?)
               ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   messages = excluded.messages,
                   updated_at = excluded.updated_at
               WHERE chat_sessions.owner = excluded.owner"#,
        )
        .bind(&session.id)
        .bind(&session.owner)
        .bind(&session.title)
        .bind(&messages)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .bind(&session.id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_session(&self, id: &str, owner: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let removed = sqlx::query("DELETE FROM chat_sessions WHERE id = ? AND owner = ?")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?
            .rows_affected()
            > 0;

        // Tombstone the id unless another owner holds it, so a save that was
        // already on its way cannot recreate the session.
        let held_by_other: Option<(String,)> =
            sqlx::query_as("SELECT owner FROM chat_sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_error)?;

        if held_by_other.is_none() {
            sqlx::query(
                "INSERT OR IGNORE INTO deleted_sessions (id, owner, deleted_at) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(owner)
            .bind(format_datetime(&Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        }

        tx.commit().await.map_err(query_error)?;
        Ok(removed)
    }
}
