//! In-process conversation buffer.

use docchat_types::chat::ChatTurn;

/// Ordered record of completed question/answer turns.
///
/// Lives for the process lifetime and grows without bound. Only successful
/// turns are pushed, so every entry has an answer.
#[derive(Debug, Default, Clone)]
pub struct ConversationMemory {
    turns: Vec<ChatTurn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the history as a transcript for the condense prompt:
    ///
    /// ```text
    /// Human: first question
    /// Assistant: first answer
    /// ```
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
