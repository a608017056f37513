//! The read / answer / print loop.
//!
//! Each non-blank line other than `exit` is handed to the answerer as typed. The loop
//! waits for the full answer before prompting again.

use std::time::Instant;

use console::style;

use docchat_core::chat::chain::QuestionAnswerer;

use super::input::{InputEvent, LineReader};
use super::renderer::ChatRenderer;

pub const QUESTION_PROMPT: &str = "Please enter your question: ";

const EXIT_KEYWORD: &str = "exit";

/// `exit` in any letter case ends the session.
pub fn is_exit_sentinel(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_KEYWORD)
}

/// Run until `exit` or end of input. Returns the number of answered questions.
///
/// A failed turn is reported on stderr and the loop keeps going.
pub async fn run_loop<L, Q>(input: &mut L, answerer: &mut Q, renderer: &ChatRenderer) -> usize
where
    L: LineReader,
    Q: QuestionAnswerer,
{
    let mut answered = 0;

    loop {
        let question = match input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("{}", style("Type 'exit' or press Ctrl+D to stop.").dim());
                continue;
            }
            InputEvent::Line(line) if is_exit_sentinel(&line) => break,
            InputEvent::Line(line) if line.trim().is_empty() => continue,
            InputEvent::Line(line) => line,
        };

        let spinner = crate::cli::spinner("Searching documents...");
        let start = Instant::now();
        let mut streaming = false;

        let result = {
            let mut on_token = |token: &str| {
                if !streaming {
                    spinner.finish_and_clear();
                    streaming = true;
                }
                renderer.print_streaming_token(token);
            };
            answerer.ask(&question, &mut on_token).await
        };
        let elapsed = start.elapsed();

        if streaming {
            println!("\n");
        } else {
            spinner.finish_and_clear();
        }

        match result {
            Ok(answer) => {
                renderer.print_response(&answer);
                renderer.print_elapsed(elapsed);
                answered += 1;
            }
            Err(e) => {
                tracing::debug!(error = ?e, "turn failed");
                eprintln!("{} {e}", style("!").red().bold());
            }
        }
    }

    answered
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use docchat_types::chat::AnswerResult;
    use docchat_types::error::{ChainError, RepositoryError};

    use super::*;

    struct ScriptedInput {
        events: VecDeque<InputEvent>,
        reads: usize,
    }

    impl ScriptedInput {
        fn lines(lines: &[&str]) -> Self {
            Self {
                events: lines.iter().map(|l| InputEvent::Line(l.to_string())).collect(),
                reads: 0,
            }
        }

        fn events(events: Vec<InputEvent>) -> Self {
            Self {
                events: events.into(),
                reads: 0,
            }
        }
    }

    impl LineReader for ScriptedInput {
        async fn read_line(&mut self) -> InputEvent {
            self.reads += 1;
            self.events.pop_front().unwrap_or(InputEvent::Eof)
        }
    }

    /// Records questions and echoes them back, optionally failing.
    #[derive(Default)]
    struct RecordingAnswerer {
        questions: Vec<String>,
        fail_on: Option<String>,
    }

    impl QuestionAnswerer for RecordingAnswerer {
        async fn ask(
            &mut self,
            question: &str,
            on_token: &mut (dyn FnMut(&str) + Send),
        ) -> Result<AnswerResult, ChainError> {
            self.questions.push(question.to_string());
            if self.fail_on.as_deref() == Some(question) {
                return Err(ChainError::Retrieval(RepositoryError::Query("index offline".into())));
            }
            on_token("echo: ");
            on_token(question);
            Ok(AnswerResult {
                answer: format!("echo: {question}"),
                standalone_question: question.to_string(),
                source_documents: Vec::new(),
            })
        }
    }

    #[test]
    fn test_exit_sentinel_is_case_insensitive() {
        for line in ["exit", "EXIT", "Exit", "eXiT"] {
            assert!(is_exit_sentinel(line), "{line}");
        }
        for line in ["", "quit", "exit now", "exits", "hello"] {
            assert!(!is_exit_sentinel(line), "{line}");
        }
    }

    #[tokio::test]
    async fn test_hello_then_exit_makes_one_call() {
        let mut input = ScriptedInput::lines(&["hello", "exit", "never read"]);
        let mut answerer = RecordingAnswerer::default();

        let answered = run_loop(&mut input, &mut answerer, &ChatRenderer::new(110)).await;

        assert_eq!(answered, 1);
        assert_eq!(answerer.questions, vec!["hello"]);
        assert_eq!(input.reads, 2);
    }

    #[tokio::test]
    async fn test_uppercase_exit_stops_immediately() {
        let mut input = ScriptedInput::lines(&["EXIT", "hello"]);
        let mut answerer = RecordingAnswerer::default();

        let answered = run_loop(&mut input, &mut answerer, &ChatRenderer::new(110)).await;

        assert_eq!(answered, 0);
        assert!(answerer.questions.is_empty());
    }

    #[tokio::test]
    async fn test_blank_lines_and_interrupts_are_skipped() {
        let mut input = ScriptedInput::events(vec![
            InputEvent::Line(String::new()),
            InputEvent::Interrupted,
            InputEvent::Line("Where to eat in Istanbul?".into()),
            InputEvent::Eof,
            InputEvent::Line("after eof".into()),
        ]);
        let mut answerer = RecordingAnswerer::default();

        let answered = run_loop(&mut input, &mut answerer, &ChatRenderer::new(110)).await;

        assert_eq!(answered, 1);
        assert_eq!(answerer.questions, vec!["Where to eat in Istanbul?"]);
    }

    #[tokio::test]
    async fn test_lines_are_forwarded_as_typed() {
        let mut input = ScriptedInput::lines(&[" exit", "  Where to eat? ", "   ", "exit"]);
        let mut answerer = RecordingAnswerer::default();

        let answered = run_loop(&mut input, &mut answerer, &ChatRenderer::new(110)).await;

        assert_eq!(answered, 2);
        assert_eq!(answerer.questions, vec![" exit", "  Where to eat? "]);
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_stop_the_loop() {
        let mut input = ScriptedInput::lines(&["first", "second", "exit"]);
        let mut answerer = RecordingAnswerer {
            fail_on: Some("first".into()),
            ..Default::default()
        };

        let answered = run_loop(&mut input, &mut answerer, &ChatRenderer::new(110)).await;

        assert_eq!(answered, 1);
        assert_eq!(answerer.questions, vec!["first", "second"]);
    }
}
