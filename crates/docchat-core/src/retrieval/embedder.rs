//! Embedder trait for text-to-vector conversion.

use docchat_types::error::RepositoryError;

/// Converts text into embedding vectors.
///
/// The same embedder must be used at ingestion and at query time, otherwise
/// distances in the index are meaningless. Implementations live in
/// docchat-infra.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in order.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, RepositoryError>> + Send;

    /// Identifier of the embedding model, stored alongside every chunk.
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}
