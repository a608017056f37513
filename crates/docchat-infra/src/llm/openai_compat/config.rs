//! Configuration and defaults for OpenAI-compatible local servers.

use docchat_types::llm::ProviderCapabilities;

/// Local servers ignore the key, but the client always sends one.
const PLACEHOLDER_API_KEY: &str = "sk-no-key-required";

/// Configuration for an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g. "llama-server").
    pub provider_name: String,
    /// Base URL including the `/v1` prefix.
    pub base_url: String,
    pub api_key: String,
    /// Model identifier sent in requests.
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// A `llama-server` process we spawned ourselves on `port`.
///
/// The context window is whatever we passed with `-c`.
pub fn llama_server_defaults(port: u16, model: &str, n_ctx: u32) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "llama-server".into(),
        base_url: format!("http://127.0.0.1:{port}/v1"),
        api_key: PLACEHOLDER_API_KEY.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens: n_ctx,
        },
    }
}

/// An already running OpenAI-compatible server (GPT4All chat, Ollama,
/// a llama-server started by hand).
pub fn external_server_defaults(base_url: &str, model: &str, n_ctx: u32) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai-compatible".into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key: PLACEHOLDER_API_KEY.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens: n_ctx,
        },
    }
}
