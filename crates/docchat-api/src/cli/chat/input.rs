//! Async readline input for the question loop.
//!
//! Wraps `rustyline_async::Readline`, mapping Ctrl+D and Ctrl+C to
//! [`InputEvent`] variants. The terminal is only in raw mode while a line is
//! being read, so answers can be printed with plain `println!`.

use std::future::Future;

use crossterm::terminal;

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A submitted line, as typed.
    Line(String),
    /// Ctrl+D.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

/// Source of user lines. The loop is generic over it so tests can script input.
pub trait LineReader {
    fn read_line(&mut self) -> impl Future<Output = InputEvent>;
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Returns the reader and a `SharedWriter` for printing without
    /// disturbing the prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }
}

impl LineReader for ChatInput {
    async fn read_line(&mut self) -> InputEvent {
        if let Err(e) = terminal::enable_raw_mode() {
            tracing::debug!(error = %e, "could not enable raw mode");
        }
        let event = self.rl.readline().await;
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::debug!(error = %e, "could not restore terminal mode");
        }

        match event {
            Ok(ReadlineEvent::Line(line)) => InputEvent::Line(line),
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(e) => {
                tracing::debug!(error = %e, "readline failed, treating as end of input");
                InputEvent::Eof
            }
        }
    }
}
