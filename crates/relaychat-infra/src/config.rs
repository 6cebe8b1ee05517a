//! Global configuration loader for relaychat.
//!
//! Reads `config.toml` from the data directory (`~/.relaychat/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use relaychat_types::config::GlobalConfig;

use crate::llm::ollama::normalize_base_url;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "RELAYCHAT_DATA_DIR";

/// Environment variable that overrides `upstream.base_url`.
pub const OLLAMA_URL_ENV: &str = "OLLAMA_URL";

/// Resolve the data directory: `RELAYCHAT_DATA_DIR`, else `~/.relaychat`,
/// else `./.relaychat` when no home directory is known.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok())
}

fn data_dir_from(env_value: Option<String>) -> PathBuf {
    match env_value.filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relaychat"),
    }
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Apply environment overrides (`OLLAMA_URL`) on top of a loaded config.
pub fn apply_env_overrides(config: &mut GlobalConfig) {
    apply_upstream_override(config, std::env::var(OLLAMA_URL_ENV).ok());
}

fn apply_upstream_override(config: &mut GlobalConfig, ollama_url: Option<String>) {
    if let Some(url) = ollama_url.filter(|v| !v.trim().is_empty()) {
        tracing::debug!(url = %url, "Upstream URL overridden from environment");
        config.upstream.base_url = normalize_base_url(&url);
    }
}

/// Load `config.toml` from `data_dir` and apply environment overrides.
pub async fn load_effective_config(data_dir: &Path) -> GlobalConfig {
    let mut config = load_global_config(data_dir).await;
    apply_env_overrides(&mut config);
    config
}
