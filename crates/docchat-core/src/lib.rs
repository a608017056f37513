//! Conversational retrieval logic and provider traits for docchat.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (language model, embedder, vector index) and the chain that strings
//! them together. It depends only on `docchat-types`, never on
//! `docchat-infra` or any model/database crate.

pub mod chat;
pub mod llm;
pub mod retrieval;
