//! Keeps the retrieved context inside a token budget.

use docchat_types::document::RetrievedChunk;

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    text.chars().count().div_ceil(4) as u32
}

/// Drop chunks from the end of the ranked list until the rest fit in
/// `max_tokens`. The best-ranked chunks are always the ones kept.
pub fn reduce_below_limit(mut chunks: Vec<RetrievedChunk>, max_tokens: u32) -> Vec<RetrievedChunk> {
    let mut total: u32 = chunks
        .iter()
        .map(|c| estimate_tokens(&c.chunk.text))
        .sum();

    while total > max_tokens {
        match chunks.pop() {
            Some(dropped) => total -= estimate_tokens(&dropped.chunk.text),
            None => break,
        }
    }
    chunks
}
