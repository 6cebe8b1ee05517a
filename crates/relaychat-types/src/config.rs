//! Global configuration types for relaychat.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! relay server address, the upstream inference server, session persistence
//! timing, and the terminal client.

use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_GREETING;

/// Top-level configuration.
///
/// Loaded from `~/.relaychat/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Where the relay server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The Ollama-compatible inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL without the `/api/...` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Whole-request timeout for one generation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Session persistence and relay cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Assistant message that opens every fresh session.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Quiet period before a scheduled save is flushed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Number of conversations kept in the relay's fallback cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            debounce_ms: default_debounce_ms(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Terminal client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Delay between revealed characters.
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_reveal_interval_ms() -> u64 {
    15
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reveal_interval_ms: default_reveal_interval_ms(),
        }
    }
}
