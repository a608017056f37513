//! Interactive question loop.
//!
//! - `banner`: the welcome message
//! - `input`: async line input via `rustyline-async`
//! - `renderer`: answer wrapping, sources and timing output
//! - `loop_runner`: reads questions and drives the chain until `exit`

pub mod banner;
pub mod input;
pub mod loop_runner;
pub mod renderer;

use docchat_types::config::ChatbotConfig;

use crate::state::ChatState;

use self::input::ChatInput;
use self::loop_runner::{run_loop, QUESTION_PROMPT};
use self::renderer::ChatRenderer;

/// Start the model and index, then answer questions until the user exits.
pub async fn run_chat(config: &ChatbotConfig) -> anyhow::Result<()> {
    let starting = super::spinner("Starting language model and loading index...");
    let state = ChatState::init(config).await;
    starting.finish_and_clear();
    let mut state = state?;

    banner::print_welcome_banner(&state.model_label, state.indexed_chunks);

    let (mut input, _writer) = ChatInput::new(QUESTION_PROMPT.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let renderer = ChatRenderer::new(config.display.wrap_width);

    let answered = run_loop(&mut input, &mut state.chain, &renderer).await;
    tracing::info!(answered, "chat session ended");

    state.shutdown().await;
    Ok(())
}
