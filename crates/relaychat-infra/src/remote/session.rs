//! `SessionStore` backed by a remote relay server.

use reqwest::{Response, StatusCode};
use relaychat_core::chat::store::SessionStore;
use relaychat_types::api::{
    DeleteSessionRequest, LoadSessionsQuery, LoadSessionsResponse, SaveSessionRequest,
};
use relaychat_types::chat::{ChatSession, SessionDraft};
use relaychat_types::error::StoreError;
use std::time::Duration;

use super::{CONNECT_TIMEOUT, base_url, error_reason};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpSessionStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionStore {
    pub fn new(server_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url(server_url),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn unavailable(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Map a non-success response to a `StoreError`.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound);
    }
    let body = response.text().await.unwrap_or_default();
    let reason = format!("server returned {}: {}", status.as_u16(), error_reason(&body));
    if status.is_client_error() {
        Err(StoreError::Rejected(reason))
    } else {
        Err(StoreError::Unavailable(reason))
    }
}

impl SessionStore for HttpSessionStore {
    async fn list(&self, owner: &str) -> Result<Vec<ChatSession>, StoreError> {
        let response = self
            .client
            .get(self.url("/api/chat/load"))
            .query(&LoadSessionsQuery {
                user_id: owner.to_string(),
            })
            .send()
            .await
            .map_err(unavailable)?;

        let body: LoadSessionsResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("invalid load response: {e}")))?;
        Ok(body.chats)
    }

    async fn save(&self, draft: &SessionDraft) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url("/api/chat/save"))
            .json(&SaveSessionRequest {
                session_id: draft.id.clone(),
                messages: Some(draft.messages.clone()),
                user_id: draft.owner.clone(),
            })
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        tracing::debug!(session_id = %draft.id, revision = draft.revision, "Session saved remotely");
        Ok(())
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.url("/api/chat/delete"))
            .json(&DeleteSessionRequest {
                session_id: id.to_string(),
                user_id: owner.to_string(),
            })
            .send()
            .await
            .map_err(unavailable)?;
        check(response).await?;
        Ok(())
    }
}
