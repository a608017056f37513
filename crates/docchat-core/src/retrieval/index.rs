//! Vector index trait.

use docchat_types::document::{DocumentChunk, RetrievedChunk};
use docchat_types::error::RepositoryError;

/// A persistent store of embedded document chunks.
///
/// Implementations live in docchat-infra (LanceDB).
pub trait DocumentIndex: Send + Sync {
    /// Return up to `limit` chunks nearest to `query_embedding`, closest first.
    fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RetrievedChunk>, RepositoryError>> + Send;

    /// Append chunks with their embeddings. `chunks` and `embeddings` are
    /// parallel slices.
    fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
        embedding_model: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Number of chunks currently stored.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
