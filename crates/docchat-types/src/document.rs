//! Document chunk types stored in and retrieved from the vector index.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a chunk of text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Origin locator: a URL or the path of the ingested file.
    pub url: String,
    /// 1-indexed page number within the origin.
    pub page: u32,
}

impl fmt::Display for SourceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} page: {}", self.url, self.page)
    }
}

/// A unit of previously ingested text with its source metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: Uuid,
    pub text: String,
    pub source: SourceMetadata,
}

impl DocumentChunk {
    /// Create a chunk with a fresh time-sortable id.
    pub fn new(text: impl Into<String>, source: SourceMetadata) -> Self {
        Self {
            chunk_id: Uuid::now_v7(),
            text: text.into(),
            source,
        }
    }
}

/// A chunk returned from a similarity search, with its cosine distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub distance: f32,
}

impl RetrievedChunk {
    /// Cosine similarity derived from the distance reported by the index.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}
