//! Question-to-chunks retrieval.

use docchat_types::document::RetrievedChunk;
use docchat_types::error::RepositoryError;

use super::embedder::Embedder;
use super::index::DocumentIndex;

/// Anything that can turn a query string into relevant chunks.
pub trait Retriever: Send + Sync {
    fn retrieve(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<RetrievedChunk>, RepositoryError>> + Send;
}

/// Embeds the query and runs a top-k similarity search on the index.
pub struct VectorStoreRetriever<E, I> {
    embedder: E,
    index: I,
    k: usize,
}

impl<E: Embedder, I: DocumentIndex> VectorStoreRetriever<E, I> {
    pub fn new(embedder: E, index: I, k: usize) -> Self {
        Self { embedder, index, k }
    }
}

impl<E: Embedder, I: DocumentIndex> Retriever for VectorStoreRetriever<E, I> {
    #[tracing::instrument(
        name = "retrieve",
        skip(self, query),
        fields(k = self.k, query_len = query.len())
    )]
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RepositoryError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or_else(|| {
            RepositoryError::Embedding("embedder returned no vector for the query".to_string())
        })?;

        let results = self.index.search(&query_vector, self.k).await?;
        tracing::debug!(k = self.k, found = results.len(), "similarity search done");
        Ok(results)
    }
}
