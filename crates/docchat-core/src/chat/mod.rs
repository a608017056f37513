//! The conversational retrieval chain and the pieces it is built from.

pub mod chain;
pub mod memory;
pub mod prompt;
pub mod token_limit;
