//! Splits loaded pages into overlapping chunks for embedding.
//!
//! Markdown pages go through `MarkdownSplitter` so headings and list items
//! stay together; everything else uses `TextSplitter`. Sizes are counted in
//! characters.

use text_splitter::{Characters, ChunkConfig, MarkdownSplitter, TextSplitter};

use docchat_types::document::DocumentChunk;

use super::loader::{LoadedPage, SourceKind};
use super::IngestError;

pub struct DocumentChunker {
    text: TextSplitter<Characters>,
    markdown: MarkdownSplitter<Characters>,
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        let config = || {
            ChunkConfig::new(chunk_size)
                .with_overlap(chunk_overlap)
                .map_err(|e| IngestError::InvalidChunking(e.to_string()))
        };

        Ok(Self {
            text: TextSplitter::new(config()?),
            markdown: MarkdownSplitter::new(config()?),
        })
    }

    /// Chunks of one page, each tagged with the page's source.
    pub fn split(&self, page: &LoadedPage) -> Vec<DocumentChunk> {
        let pieces: Vec<&str> = match page.kind {
            SourceKind::Markdown => self.markdown.chunks(&page.text).collect(),
            _ => self.text.chunks(&page.text).collect(),
        };

        pieces
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .map(|piece| DocumentChunk::new(piece, page.source.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use docchat_types::document::SourceMetadata;

    use super::*;

    fn loaded(text: String, kind: SourceKind) -> LoadedPage {
        LoadedPage {
            text,
            kind,
            source: SourceMetadata {
                url: "guide.pdf".to_string(),
                page: 7,
            },
        }
    }

    #[test]
    fn test_short_page_is_one_chunk() {
        let chunker = DocumentChunker::new(1600, 80).unwrap();
        let chunks = chunker.split(&loaded("A short paragraph.".to_string(), SourceKind::Text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A short paragraph.");
        assert_eq!(chunks[0].source.page, 7);
    }

    #[test]
    fn test_long_page_respects_chunk_size() {
        let chunker = DocumentChunker::new(200, 20).unwrap();
        let text = "The restaurant overlooks the water. ".repeat(40);
        let chunks = chunker.split(&loaded(text, SourceKind::Text));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 200);
            assert_eq!(chunk.source.url, "guide.pdf");
        }
    }

    #[test]
    fn test_markdown_page_is_split() {
        let chunker = DocumentChunker::new(120, 0).unwrap();
        let mut text = String::new();
        for i in 0..6 {
            text.push_str(&format!("## Section {i}\n\nSome text about section {i}.\n\n"));
        }
        let chunks = chunker.split(&loaded(text, SourceKind::Markdown));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 120));
    }

    #[test]
    fn test_overlap_larger_than_size_is_rejected() {
        assert!(matches!(
            DocumentChunker::new(50, 100),
            Err(IngestError::InvalidChunking(_))
        ));
    }
}
