//! Similarity retrieval over the local document index.
//!
//! `Embedder` turns text into vectors, `DocumentIndex` stores and searches
//! them, and `VectorStoreRetriever` glues the two into "question in, top-k
//! chunks out".

pub mod box_embedder;
pub mod embedder;
pub mod index;
pub mod retriever;
