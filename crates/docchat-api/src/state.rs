//! Startup wiring for the chat session.
//!
//! Builds the concrete chain from configuration: the language model server
//! (spawned or external), the local embedding model, and the LanceDB index.
//! Any failure here aborts startup.

use anyhow::Context;

use docchat_core::chat::chain::{ChainSettings, ConversationalRetrievalChain};
use docchat_core::llm::box_provider::BoxLlmProvider;
use docchat_core::retrieval::box_embedder::BoxEmbedder;
use docchat_core::retrieval::index::DocumentIndex;
use docchat_core::retrieval::retriever::VectorStoreRetriever;
use docchat_infra::config::embedding_cache_dir;
use docchat_infra::llm::local_server::LocalModelServer;
use docchat_infra::llm::openai_compat::OpenAiCompatibleProvider;
use docchat_infra::vector::documents::LanceDocumentIndex;
use docchat_infra::vector::embedder::FastEmbedEmbedder;
use docchat_infra::vector::lance::LanceVectorStore;
use docchat_types::config::ChatbotConfig;

pub type ConcreteRetriever = VectorStoreRetriever<BoxEmbedder, LanceDocumentIndex>;
pub type ConcreteChain = ConversationalRetrievalChain<ConcreteRetriever>;

/// Everything a chat session needs. Dropping it stops a spawned server.
pub struct ChatState {
    pub chain: ConcreteChain,
    pub server: Option<LocalModelServer>,
    pub model_label: String,
    pub indexed_chunks: u64,
}

impl ChatState {
    pub async fn init(config: &ChatbotConfig) -> anyhow::Result<Self> {
        let (provider, server, model_label) = start_llm(config).await?;

        let embedder = load_embedder(config).await?;

        let store = LanceVectorStore::open_existing(config.index.path.clone())
            .await
            .with_context(|| format!("Failed to open vector index at {}", config.index.path.display()))?;
        let index = LanceDocumentIndex::open(&store, &config.index.table)
            .await
            .with_context(|| {
                format!(
                    "Index table '{}' is missing; run `docchat ingest <dir>` first",
                    config.index.table
                )
            })?;

        let indexed_chunks = index.count().await?;
        if indexed_chunks == 0 {
            tracing::warn!("index table '{}' is empty", config.index.table);
        }

        let retriever = VectorStoreRetriever::new(embedder, index, config.index.top_k);
        let settings = ChainSettings {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: Some(config.llm.temperature),
            max_tokens_limit: config.index.max_tokens_limit,
        };

        Ok(Self {
            chain: ConversationalRetrievalChain::new(provider, retriever, settings),
            server,
            model_label,
            indexed_chunks,
        })
    }

    /// Stop the spawned model server, if any.
    pub async fn shutdown(self) {
        if let Some(server) = self.server {
            server.shutdown().await;
        }
    }
}

async fn start_llm(
    config: &ChatbotConfig,
) -> anyhow::Result<(BoxLlmProvider, Option<LocalModelServer>, String)> {
    let llm = &config.llm;
    if llm.spawn_server {
        let server = LocalModelServer::start(llm).await?;
        let provider = OpenAiCompatibleProvider::llama_server(server.port(), &llm.model, llm.n_ctx);
        let label = llm
            .model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| llm.model.clone());
        Ok((BoxLlmProvider::new(provider), Some(server), label))
    } else {
        tracing::info!(base_url = %llm.base_url, "using external model server");
        let provider = OpenAiCompatibleProvider::external(&llm.base_url, &llm.model, llm.n_ctx);
        Ok((BoxLlmProvider::new(provider), None, llm.model.clone()))
    }
}

/// Loading may download the model on first run, so it happens off the runtime.
pub async fn load_embedder(config: &ChatbotConfig) -> anyhow::Result<BoxEmbedder> {
    let cache_dir = embedding_cache_dir(config);
    let show_progress = config.embedding.show_download_progress;
    let embedder = tokio::task::spawn_blocking(move || FastEmbedEmbedder::new(cache_dir, show_progress))
        .await
        .context("Embedding model loader panicked")??;
    Ok(BoxEmbedder::new(embedder))
}
