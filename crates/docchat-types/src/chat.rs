//! Conversation types: one exchanged turn and one answer result.

use serde::{Deserialize, Serialize};

use crate::document::DocumentChunk;

/// A single question/answer exchange kept in the memory buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// Result of one pipeline call.
///
/// Consumed immediately for display and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// The generated answer text.
    pub answer: String,
    /// The question actually sent to the retriever (rewritten when history exists).
    pub standalone_question: String,
    /// Chunks placed into the prompt, in retrieval order.
    pub source_documents: Vec<DocumentChunk>,
}

impl AnswerResult {
    /// Whether the pipeline returned any chunk worth citing.
    pub fn has_sources(&self) -> bool {
        !self.source_documents.is_empty()
    }
}
