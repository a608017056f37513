//! Infrastructure layer for docchat.
//!
//! Implements the ports defined in `docchat-core`: an OpenAI-compatible
//! client for a local `llama-server`, a LanceDB document index, fastembed
//! embeddings, and the loaders and chunker used to build the index.

pub mod config;
pub mod ingest;
pub mod llm;
pub mod vector;
