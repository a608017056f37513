//! Configuration loader for docchat.
//!
//! Reads `docchat.toml` (or the path given with `--config`) into
//! [`ChatbotConfig`]. A missing or malformed file falls back to defaults so
//! the chatbot always starts.

use std::path::{Path, PathBuf};

use docchat_types::config::ChatbotConfig;

/// Load configuration from `path`.
///
/// - Missing file: returns [`ChatbotConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
/// - Otherwise: returns the parsed config, with absent fields defaulted.
pub async fn load_config(path: &Path) -> ChatbotConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return ChatbotConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return ChatbotConfig::default();
        }
    };

    match toml::from_str::<ChatbotConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            ChatbotConfig::default()
        }
    }
}

/// Directory fastembed downloads its ONNX models into.
///
/// Uses the configured `embedding.cache_dir`, else `<platform cache>/docchat/fastembed`,
/// else `.fastembed_cache` in the working directory.
pub fn embedding_cache_dir(config: &ChatbotConfig) -> PathBuf {
    if let Some(dir) = &config.embedding.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .map(|d| d.join("docchat").join("fastembed"))
        .unwrap_or_else(|| PathBuf::from(".fastembed_cache"))
}
