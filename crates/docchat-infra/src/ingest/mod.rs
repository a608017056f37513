//! Building the vector index from a directory of source documents.
//!
//! `loader` extracts pages, `chunker` splits them, `indexer` embeds the
//! chunks and appends them to the index in batches.

pub mod chunker;
pub mod indexer;
pub mod loader;

use std::path::PathBuf;

use docchat_types::error::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("invalid chunk settings: {0}")]
    InvalidChunking(String),

    #[error("loader task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
