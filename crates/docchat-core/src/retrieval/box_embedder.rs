//! BoxEmbedder -- object-safe wrapper for [`Embedder`].

use futures_util::future::{BoxFuture, FutureExt};

use docchat_types::error::RepositoryError;

use super::embedder::Embedder;

/// Object-safe version of [`Embedder`] with a boxed future.
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RepositoryError>>;

    fn model_name_dyn(&self) -> &str;

    fn dimension_dyn(&self) -> usize;
}

impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RepositoryError>> {
        self.embed(texts).boxed()
    }

    fn model_name_dyn(&self) -> &str {
        self.model_name()
    }

    fn dimension_dyn(&self) -> usize {
        self.dimension()
    }
}

/// Type-erased embedder shared by the chat retriever and the ingest command.
pub struct BoxEmbedder {
    inner: Box<dyn EmbedderDyn + Send + Sync>,
}

impl BoxEmbedder {
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }
}

// `BoxEmbedder` is itself an `Embedder`, so generic code such as
// `VectorStoreRetriever<E, I>` accepts it directly.
impl Embedder for BoxEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        self.inner.embed_boxed(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name_dyn()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension_dyn()
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        fn embed(
            &self,
            texts: &[String],
        ) -> impl Future<Output = Result<Vec<Vec<f32>>, RepositoryError>> + Send {
            let vectors = texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect();
            async move { Ok(vectors) }
        }

        fn model_name(&self) -> &str {
            "length"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_box_embedder_delegates() {
        let embedder = BoxEmbedder::new(LengthEmbedder);
        assert_eq!(embedder.model_name(), "length");
        assert_eq!(embedder.dimension(), 2);

        let vectors = embedder
            .embed(&["abc".to_string(), "a".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![3.0, 1.0], vec![1.0, 1.0]]);
    }
}
