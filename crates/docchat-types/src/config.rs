//! Configuration types for docchat.
//!
//! `ChatbotConfig` represents the optional `docchat.toml` file. Every field
//! has a default, so an empty or missing file yields the stock setup: a
//! GPT4All-J model under `../../models` and a vector index under `../data`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatbotConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Local language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Path to the GGUF weights file handed to `llama-server -m`.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Context window size handed to `llama-server -c`.
    #[serde(default = "default_n_ctx")]
    pub n_ctx: u32,

    /// Spawn `llama-server` ourselves. When false, attach to `base_url`.
    #[serde(default = "default_spawn_server")]
    pub spawn_server: bool,

    /// `llama-server` executable, looked up on `PATH` when relative.
    #[serde(default = "default_server_binary")]
    pub server_binary: PathBuf,

    /// Port for the spawned server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenAI-compatible base URL used when `spawn_server` is false.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent in requests. Local servers mostly ignore it.
    #[serde(default = "default_model_name")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Seconds to wait for the spawned server's health check.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("../../models/ggml-gpt4all-j.gguf")
}

fn default_n_ctx() -> u32 {
    2048
}

fn default_spawn_server() -> bool {
    true
}

fn default_server_binary() -> PathBuf {
    PathBuf::from("llama-server")
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://127.0.0.1:4891/v1".to_string()
}

fn default_model_name() -> String {
    "gpt4all-j".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f64 {
    0.7
}

fn default_startup_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            n_ctx: default_n_ctx(),
            spawn_server: default_spawn_server(),
            server_binary: default_server_binary(),
            port: default_port(),
            base_url: default_base_url(),
            model: default_model_name(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            startup_timeout_secs: default_startup_timeout_secs(),
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the LanceDB database.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    #[serde(default = "default_table")]
    pub table: String,

    /// Number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Token ceiling for the retrieved chunks placed in the prompt.
    #[serde(default = "default_max_tokens_limit")]
    pub max_tokens_limit: u32,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("../data/lancedb")
}

fn default_table() -> String {
    "documents".to_string()
}

fn default_top_k() -> usize {
    4
}

fn default_max_tokens_limit() -> u32 {
    400
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            table: default_table(),
            top_k: default_top_k(),
            max_tokens_limit: default_max_tokens_limit(),
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Where fastembed caches downloaded ONNX models. Defaults to the
    /// platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_show_download_progress")]
    pub show_download_progress: bool,
}

fn default_show_download_progress() -> bool {
    true
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            show_download_progress: default_show_download_progress(),
        }
    }
}

/// Ingestion settings for `docchat ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks embedded and written per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_chunk_size() -> usize {
    1600
}

fn default_chunk_overlap() -> usize {
    80
}

fn default_batch_size() -> usize {
    100
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
        }
    }
}

/// Terminal output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Column width answers are wrapped to.
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

fn default_wrap_width() -> usize {
    110
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            wrap_width: default_wrap_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ChatbotConfig::default();
        assert_eq!(
            config.llm.model_path,
            PathBuf::from("../../models/ggml-gpt4all-j.gguf")
        );
        assert_eq!(config.llm.n_ctx, 2048);
        assert!(config.llm.spawn_server);
        assert_eq!(config.index.path, PathBuf::from("../data/lancedb"));
        assert_eq!(config.index.top_k, 4);
        assert_eq!(config.index.max_tokens_limit, 400);
        assert_eq!(config.ingest.chunk_size, 1600);
        assert_eq!(config.ingest.chunk_overlap, 80);
        assert_eq!(config.display.wrap_width, 110);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: ChatbotConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.n_ctx, 2048);
        assert_eq!(config.index.table, "documents");
        assert!(config.embedding.cache_dir.is_none());
        assert!(config.embedding.show_download_progress);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml_str = r#"
[llm]
model_path = "/models/mistral-7b.Q4_K_M.gguf"
n_ctx = 4096
spawn_server = false
base_url = "http://localhost:11434/v1"

[index]
top_k = 6
"#;
        let config: ChatbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.llm.model_path,
            PathBuf::from("/models/mistral-7b.Q4_K_M.gguf")
        );
        assert_eq!(config.llm.n_ctx, 4096);
        assert!(!config.llm.spawn_server);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.port, 8080);
        assert_eq!(config.index.top_k, 6);
        assert_eq!(config.index.max_tokens_limit, 400);
        assert_eq!(config.display.wrap_width, 110);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ChatbotConfig, _> = toml::from_str("[index]\ntop_k = \"four\"\n");
        assert!(result.is_err());
    }
}
