//! Language model backends.
//!
//! The chatbot talks to its local model through the OpenAI chat completions
//! protocol. [`local_server::LocalModelServer`] optionally spawns and owns
//! the `llama-server` process that serves it.

pub mod local_server;
pub mod openai_compat;
