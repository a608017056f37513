//! Prompt templates for the two model calls in a turn.

use docchat_types::document::DocumentChunk;

/// Prompt asking the model to rewrite a follow-up into a standalone question.
pub fn condense_prompt(chat_history: &str, question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:"
    )
}

/// Prompt asking the model to answer from the retrieved context only.
pub fn qa_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"
    )
}

/// Join chunk texts into the `{context}` block, separated by blank lines.
pub fn format_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
