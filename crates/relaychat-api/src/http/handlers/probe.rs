//! Upstream connectivity check.
//!
//! GET /api/test-ollama

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use relaychat_core::llm::provider::GenerationProvider;

use crate::state::AppState;

/// GET /api/test-ollama
pub async fn test_upstream(State(state): State<AppState>) -> Response {
    let provider = state.relay.provider();
    match provider.probe().await {
        Ok(report) => Json(json!({
            "status": "success",
            "ollamaUrl": report.base_url,
            "models": report.models,
            "message": "Ollama API is reachable",
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, url = %provider.base_url(), "Upstream probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "ollamaUrl": provider.base_url(),
                    "models": [],
                    "message": format!("Failed to connect to Ollama: {e}"),
                })),
            )
                .into_response()
        }
    }
}
