//! Streaming relay endpoint and the stateless chat helpers.
//!
//! POST /api/chat streams the assistant answer as chunked `text/plain`:
//! raw fragments in arrival order, or a single `Error: <message>` text
//! when upstream fails before producing output.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;

use relaychat_core::chat::title::derive_title;
use relaychat_types::api::{ClearSessionRequest, StatusResponse, TitleRequest, TitleResponse};
use relaychat_types::chat::ChatTurnRequest;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/chat
pub async fn relay_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Response, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt is required".to_string()));
    }

    tracing::info!(
        session_id = request.session_id.as_deref().unwrap_or(""),
        history = request.messages.len(),
        "Relaying chat turn"
    );

    let text = state.relay.relay_text(request.into());
    let body = Body::from_stream(text.map(Ok::<_, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// POST /api/chat/clear
///
/// Drops the relay's cached copy of a conversation. Persisted sessions are
/// untouched.
pub async fn clear_chat(
    State(state): State<AppState>,
    Json(request): Json<ClearSessionRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    if request.session_id.is_empty() {
        return Err(AppError::Validation("Session ID is required".to_string()));
    }

    let dropped = state.cache.forget(&request.session_id);
    tracing::debug!(session_id = %request.session_id, dropped, "Cleared cached conversation");

    Ok(Json(StatusResponse::ok("Chat cleared successfully")))
}

/// POST /api/chat/generate-title
pub async fn generate_title(Json(request): Json<TitleRequest>) -> Json<TitleResponse> {
    Json(TitleResponse {
        title: derive_title(&request.messages),
        success: true,
    })
}
