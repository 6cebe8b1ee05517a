//! Axum router configuration with middleware.
//!
//! Chat routes live under `/api/chat`. Middleware: CORS, tracing.

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::relay_chat))
        .route("/chat/load", get(handlers::session::load_sessions))
        .route("/chat/save", post(handlers::session::save_session))
        .route("/chat/delete", delete(handlers::session::delete_session))
        .route("/chat/clear", post(handlers::chat::clear_chat))
        .route("/chat/generate-title", post(handlers::chat::generate_title))
        .route("/test-ollama", get(handlers::probe::test_upstream));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
