//! Vector index infrastructure.
//!
//! LanceDB holds the embedded document chunks, fastembed produces the
//! embeddings, and the Arrow schema ties the two together.

pub mod documents;
pub mod embedder;
pub mod lance;
pub mod schema;
