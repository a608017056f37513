//! Shared domain types for docchat.
//!
//! This crate contains the data shapes passed between the chat loop, the
//! retrieval chain, and the infrastructure adapters: LLM requests and stream
//! events, document chunks, chat turns, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, thiserror.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
