//! LanceDB-backed [`DocumentIndex`].

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use docchat_core::retrieval::index::DocumentIndex;
use docchat_types::document::{DocumentChunk, RetrievedChunk, SourceMetadata};
use docchat_types::error::RepositoryError;

use super::lance::LanceVectorStore;
use super::schema::{documents_schema, vector_item_field, EMBEDDING_DIMENSION};

/// Document chunk table searched by cosine distance.
pub struct LanceDocumentIndex {
    table: lancedb::Table,
}

impl LanceDocumentIndex {
    /// Open an existing table for querying. A missing table is reported as
    /// [`RepositoryError::NotFound`] rather than created.
    pub async fn open(store: &LanceVectorStore, table_name: &str) -> Result<Self, RepositoryError> {
        match store.open_table(table_name).await {
            Ok(table) => Ok(Self { table }),
            Err(lancedb::Error::TableNotFound { .. }) => {
                Err(RepositoryError::NotFound(table_name.to_string()))
            }
            Err(e) => Err(RepositoryError::Connection(format!(
                "Failed to open table {table_name}: {e}"
            ))),
        }
    }

    /// Open the table for writing, creating it if needed.
    pub async fn create(store: &LanceVectorStore, table_name: &str) -> Result<Self, RepositoryError> {
        let table = store
            .ensure_table(table_name, Arc::new(documents_schema()))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to ensure table: {e}")))?;
        Ok(Self { table })
    }

    fn build_record_batch(
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
        embedding_model: &str,
    ) -> Result<RecordBatch, RepositoryError> {
        if chunks.len() != embeddings.len() {
            return Err(RepositoryError::InvalidData(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut flat: Vec<f32> = Vec::with_capacity(embeddings.len() * EMBEDDING_DIMENSION as usize);
        for embedding in embeddings {
            if embedding.len() != EMBEDDING_DIMENSION as usize {
                return Err(RepositoryError::InvalidData(format!(
                    "embedding has {} dimensions, expected {EMBEDDING_DIMENSION}",
                    embedding.len()
                )));
            }
            flat.extend_from_slice(embedding);
        }

        let chunk_ids = StringArray::from_iter_values(chunks.iter().map(|c| c.chunk_id.to_string()));
        let texts = StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()));
        let urls = StringArray::from_iter_values(chunks.iter().map(|c| c.source.url.as_str()));
        let pages = Int32Array::from_iter_values(
            chunks
                .iter()
                .map(|c| i32::try_from(c.source.page).unwrap_or(i32::MAX)),
        );
        let models = StringArray::from_iter_values(chunks.iter().map(|_| embedding_model));

        let vectors = FixedSizeListArray::try_new(
            vector_item_field(),
            EMBEDDING_DIMENSION,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| RepositoryError::InvalidData(format!("Failed to build vector column: {e}")))?;

        RecordBatch::try_new(
            Arc::new(documents_schema()),
            vec![
                Arc::new(chunk_ids),
                Arc::new(texts),
                Arc::new(urls),
                Arc::new(pages),
                Arc::new(models),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RepositoryError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| RepositoryError::InvalidData(format!("missing or mistyped column {name}")))
    }

    /// Parse search result rows. The `_distance` column is added by LanceDB.
    fn record_batch_to_chunks(batch: &RecordBatch) -> Result<Vec<RetrievedChunk>, RepositoryError> {
        let chunk_ids = Self::string_column(batch, "chunk_id")?;
        let texts = Self::string_column(batch, "text")?;
        let urls = Self::string_column(batch, "url")?;
        let pages = batch
            .column_by_name("page")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| RepositoryError::InvalidData("missing or mistyped column page".into()))?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        (0..batch.num_rows())
            .map(|i| {
                let chunk_id = Uuid::parse_str(chunk_ids.value(i)).map_err(|e| {
                    RepositoryError::InvalidData(format!("bad chunk_id {}: {e}", chunk_ids.value(i)))
                })?;
                Ok(RetrievedChunk {
                    chunk: DocumentChunk {
                        chunk_id,
                        text: texts.value(i).to_string(),
                        source: SourceMetadata {
                            url: urls.value(i).to_string(),
                            page: pages.value(i).max(0) as u32,
                        },
                    },
                    distance: distances.map_or(0.0, |d| d.value(i)),
                })
            })
            .collect()
    }
}

impl DocumentIndex for LanceDocumentIndex {
    #[tracing::instrument(
        name = "lancedb.search",
        skip_all,
        fields(limit = limit, dim = query_embedding.len())
    )]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .table
            .vector_search(query_embedding)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))?;

        let mut found = Vec::new();
        for batch in &batches {
            if batch.num_rows() > 0 {
                found.extend(Self::record_batch_to_chunks(batch)?);
            }
        }

        found.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found.truncate(limit);
        Ok(found)
    }

    async fn add(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
        embedding_model: &str,
    ) -> Result<(), RepositoryError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let batch = Self::build_record_batch(chunks, embeddings, embedding_model)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to add chunks: {e}")))?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.table
            .count_rows(None)
            .await
            .map(|n| n as u64)
            .map_err(|e| RepositoryError::Query(format!("Failed to count rows: {e}")))
    }
}
