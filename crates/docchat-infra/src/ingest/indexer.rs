//! Directory-to-index ingestion.

use std::path::{Path, PathBuf};

use docchat_core::retrieval::embedder::Embedder;
use docchat_core::retrieval::index::DocumentIndex;
use docchat_types::document::DocumentChunk;

use super::chunker::DocumentChunker;
use super::loader::{self, LoadedPage};
use super::IngestError;

/// Progress notifications for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestProgress {
    Loaded { files: usize, pages: usize },
    Split { chunks: usize },
    Stored { done: usize, total: usize },
}

/// Counts from a finished ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub skipped_files: usize,
    pub pages: usize,
    pub chunks: usize,
}

pub struct DocumentIndexer<E, I> {
    embedder: E,
    index: I,
    chunker: DocumentChunker,
    batch_size: usize,
}

impl<E: Embedder, I: DocumentIndex> DocumentIndexer<E, I> {
    pub fn new(embedder: E, index: I, chunker: DocumentChunker, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Load, split, embed and store every supported file under `dir`.
    ///
    /// Files that fail to load are logged and skipped. Embedding or storage
    /// failures abort the run; batches already written stay in the index.
    #[tracing::instrument(name = "ingest", skip_all, fields(dir = %dir.display()))]
    pub async fn ingest_directory(
        &self,
        dir: &Path,
        mut on_progress: impl FnMut(IngestProgress),
    ) -> Result<IngestReport, IngestError> {
        let files = loader::discover_files(dir)?;
        tracing::info!(dir = %dir.display(), files = files.len(), "loading source files");

        let file_count = files.len();
        let (pages, skipped_files) = tokio::task::spawn_blocking(move || load_all(files))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?;
        on_progress(IngestProgress::Loaded {
            files: file_count - skipped_files,
            pages: pages.len(),
        });

        let chunks: Vec<DocumentChunk> = pages
            .iter()
            .flat_map(|page| self.chunker.split(page))
            .collect();
        on_progress(IngestProgress::Split {
            chunks: chunks.len(),
        });
        tracing::info!(pages = pages.len(), chunks = chunks.len(), "split documents");

        let mut done = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            self.index
                .add(batch, &embeddings, self.embedder.model_name())
                .await?;

            done += batch.len();
            tracing::debug!(done, total = chunks.len(), "stored batch");
            on_progress(IngestProgress::Stored {
                done,
                total: chunks.len(),
            });
        }

        Ok(IngestReport {
            files: file_count - skipped_files,
            skipped_files,
            pages: pages.len(),
            chunks: chunks.len(),
        })
    }
}

fn load_all(files: Vec<PathBuf>) -> (Vec<LoadedPage>, usize) {
    let mut pages = Vec::new();
    let mut skipped = 0;
    for path in files {
        match loader::load_file(&path) {
            Ok(loaded) => {
                tracing::debug!(path = %path.display(), pages = loaded.len(), "loaded");
                pages.extend(loaded);
            }
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                skipped += 1;
            }
        }
    }
    (pages, skipped)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use docchat_types::document::RetrievedChunk;
    use docchat_types::error::RepositoryError;

    use crate::vector::documents::LanceDocumentIndex;
    use crate::vector::lance::LanceVectorStore;
    use crate::vector::schema::EMBEDDING_DIMENSION;

    use super::*;

    /// Embeds every text to the same normalised vector.
    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
            let dim = EMBEDDING_DIMENSION as usize;
            let value = 1.0 / (dim as f32).sqrt();
            Ok(texts.iter().map(|_| vec![value; dim]).collect())
        }

        fn model_name(&self) -> &str {
            "constant"
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIMENSION as usize
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        batches: Mutex<Vec<usize>>,
    }

    impl DocumentIndex for RecordingIndex {
        async fn search(
            &self,
            _query_embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<RetrievedChunk>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn add(
            &self,
            chunks: &[DocumentChunk],
            embeddings: &[Vec<f32>],
            embedding_model: &str,
        ) -> Result<(), RepositoryError> {
            assert_eq!(chunks.len(), embeddings.len());
            assert_eq!(embedding_model, "constant");
            self.batches.lock().unwrap().push(chunks.len());
            Ok(())
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            Ok(self.batches.lock().unwrap().iter().sum::<usize>() as u64)
        }
    }

    fn write_corpus(dir: &Path) {
        std::fs::write(dir.join("a.txt"), "Istanbul dining. ".repeat(30)).unwrap();
        std::fs::write(dir.join("b.md"), "# Paris\n\nA rooftop table.\n").unwrap();
        std::fs::write(dir.join("broken.pdf"), b"not a pdf").unwrap();
        std::fs::write(dir.join("ignored.csv"), "a,b").unwrap();
    }

    #[tokio::test]
    async fn test_ingest_batches_and_reports() {
        let tmp = tempfile::tempdir().unwrap();
        write_corpus(tmp.path());

        let indexer = DocumentIndexer::new(
            ConstantEmbedder,
            RecordingIndex::default(),
            DocumentChunker::new(100, 10).unwrap(),
            3,
        );

        let mut events = Vec::new();
        let report = indexer
            .ingest_directory(tmp.path(), |p| events.push(p))
            .await
            .unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.skipped_files, 1);
        assert_eq!(report.pages, 2);
        assert!(report.chunks > 3);

        let batches = indexer.index().batches.lock().unwrap().clone();
        assert!(batches.iter().all(|&n| n <= 3));
        assert_eq!(batches.iter().sum::<usize>(), report.chunks);

        assert_eq!(events[0], IngestProgress::Loaded { files: 2, pages: 2 });
        assert_eq!(
            events.last(),
            Some(&IngestProgress::Stored {
                done: report.chunks,
                total: report.chunks
            })
        );
    }

    #[tokio::test]
    async fn test_ingest_into_lancedb() {
        let corpus = tempfile::tempdir().unwrap();
        write_corpus(corpus.path());
        let db_dir = tempfile::tempdir().unwrap();

        let store = LanceVectorStore::new(db_dir.path().to_path_buf())
            .await
            .unwrap();
        let index = LanceDocumentIndex::create(&store, "documents").await.unwrap();
        let indexer = DocumentIndexer::new(
            ConstantEmbedder,
            index,
            DocumentChunker::new(1600, 80).unwrap(),
            100,
        );

        let report = indexer
            .ingest_directory(corpus.path(), |_| {})
            .await
            .unwrap();
        assert_eq!(indexer.index().count().await.unwrap(), report.chunks as u64);

        let hits = indexer
            .index()
            .search(&vec![1.0 / (384f32).sqrt(); 384], 4)
            .await
            .unwrap();
        assert_eq!(hits.len(), report.chunks.min(4));
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let indexer = DocumentIndexer::new(
            ConstantEmbedder,
            RecordingIndex::default(),
            DocumentChunker::new(100, 10).unwrap(),
            10,
        );
        let err = indexer
            .ingest_directory(&tmp.path().join("absent"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotADirectory(_)));
    }
}
