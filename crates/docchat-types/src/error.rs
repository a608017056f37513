use thiserror::Error;

use crate::llm::LlmError;

/// Errors from vector index and embedding operations (used by trait
/// definitions in docchat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("vector store connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("table not found: {0}")]
    NotFound(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Errors from one pass through the conversational retrieval chain.
///
/// A failed pass leaves the conversation memory untouched.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RepositoryError),
}
