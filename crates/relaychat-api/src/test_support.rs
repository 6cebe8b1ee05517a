//! Servers and writers shared by the HTTP and chat loop tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::{Json, Router};
use relaychat_types::config::GlobalConfig;
use serde_json::{json, Value};

use crate::http::router::build_router;
use crate::state::AppState;

/// What the fake upstream answers to every chat: "Hi there" in two records.
pub const NDJSON_REPLY: &str = concat!(
    r#"{"message":{"role":"assistant","content":"Hi"}}"#,
    "\n",
    r#"{"message":{"role":"assistant","content":" there"}}"#,
    "\n",
    r#"{"done":true}"#,
    "\n",
);

pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fake upstream recording the request bodies it received.
pub async fn spawn_upstream() -> (String, Arc<Mutex<Vec<Value>>>) {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let recorded = Arc::clone(&seen);
    let app = Router::new()
        .route(
            "/api/chat",
            post(move |Json(body): Json<Value>| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(body);
                    NDJSON_REPLY
                }
            }),
        )
        .route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama3"}]})) }),
        );
    (spawn(app).await, seen)
}

/// A URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub struct TestServer {
    pub url: String,
    pub state: AppState,
    _dir: tempfile::TempDir,
}

/// Relay server on an ephemeral port with a temporary database.
pub async fn start_server(upstream_url: &str) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let mut config = GlobalConfig::default();
    config.upstream.base_url = upstream_url.to_string();
    config.upstream.connect_timeout_secs = 2;
    let state = AppState::init(dir.path().to_path_buf(), config).await.unwrap();
    let url = spawn(build_router(state.clone())).await;
    TestServer {
        url,
        state,
        _dir: dir,
    }
}

/// In-memory writer standing in for the readline `SharedWriter`.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    /// Everything written so far, without ANSI styling.
    pub fn text(&self) -> String {
        let bytes = self.0.lock().unwrap().clone();
        console::strip_ansi_codes(&String::from_utf8(bytes).unwrap()).to_string()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
