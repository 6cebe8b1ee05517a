//! Session persistence endpoints.
//!
//! GET    /api/chat/load?userId=   - List an owner's sessions
//! POST   /api/chat/save           - Upsert a session snapshot
//! DELETE /api/chat/delete         - Delete a session

use axum::extract::{Query, State};
use axum::Json;

use relaychat_types::api::{
    DeleteSessionRequest, LoadSessionsQuery, LoadSessionsResponse, SaveSessionRequest,
    StatusResponse,
};
use relaychat_types::chat::SessionDraft;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /api/chat/load
pub async fn load_sessions(
    State(state): State<AppState>,
    Query(query): Query<LoadSessionsQuery>,
) -> Result<Json<LoadSessionsResponse>, AppError> {
    if query.user_id.is_empty() {
        return Err(AppError::Validation("User ID is required".to_string()));
    }

    let chats = state.session_service.list_sessions(&query.user_id).await?;
    Ok(Json(LoadSessionsResponse {
        chats,
        success: true,
    }))
}

/// POST /api/chat/save
pub async fn save_session(
    State(state): State<AppState>,
    Json(request): Json<SaveSessionRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let messages = match request.messages {
        Some(messages) if !request.session_id.is_empty() && !request.user_id.is_empty() => {
            messages
        }
        _ => return Err(AppError::Validation("Missing required fields".to_string())),
    };

    let draft = SessionDraft {
        id: request.session_id,
        owner: request.user_id,
        messages,
        revision: 0,
    };
    state.session_service.save_session(&draft).await?;

    Ok(Json(StatusResponse::ok("Chat saved successfully")))
}

/// DELETE /api/chat/delete
///
/// Deleting a session the caller does not own succeeds without effect.
pub async fn delete_session(
    State(state): State<AppState>,
    Json(request): Json<DeleteSessionRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    if request.session_id.is_empty() || request.user_id.is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    state
        .session_service
        .delete_session(&request.session_id, &request.user_id)
        .await?;

    Ok(Json(StatusResponse::ok("Chat deleted successfully")))
}
