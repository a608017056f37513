//! Conversational retrieval chain.
//!
//! One call to [`ConversationalRetrievalChain::ask`] runs a full turn:
//!
//! 1. rewrite the question into a standalone one when history exists
//! 2. retrieve the top-k chunks for the standalone question
//! 3. drop trailing chunks until the context fits the token ceiling
//! 4. stream the answer from the model, forwarding every piece of text
//! 5. record the turn in memory
//!
//! Steps run strictly in order. A failure at any step returns an error and
//! leaves memory as it was.

use std::future::Future;

use futures_util::StreamExt;
use tracing::{Instrument, info_span};

use docchat_types::chat::AnswerResult;
use docchat_types::document::DocumentChunk;
use docchat_types::error::ChainError;
use docchat_types::llm::{CompletionRequest, Message, StopReason, StreamEvent};

use crate::llm::box_provider::BoxLlmProvider;
use crate::retrieval::retriever::Retriever;

use super::memory::ConversationMemory;
use super::prompt;
use super::token_limit::reduce_below_limit;

/// Generation parameters shared by both model calls.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Token ceiling for the retrieved context.
    pub max_tokens_limit: u32,
}

/// Something that answers one question per call, keeping its own history.
///
/// The chat loop is written against this trait rather than the concrete
/// chain so it can be driven by a scripted answerer in tests.
pub trait QuestionAnswerer {
    fn ask(
        &mut self,
        question: &str,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> impl Future<Output = Result<AnswerResult, ChainError>>;
}

pub struct ConversationalRetrievalChain<R> {
    llm: BoxLlmProvider,
    retriever: R,
    memory: ConversationMemory,
    settings: ChainSettings,
}

impl<R: Retriever> ConversationalRetrievalChain<R> {
    pub fn new(llm: BoxLlmProvider, retriever: R, settings: ChainSettings) -> Self {
        Self {
            llm,
            retriever,
            memory: ConversationMemory::new(),
            settings,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    fn request(&self, prompt: String, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream,
        }
    }

    /// Rewrite `question` using the conversation so far. The first question
    /// of a session is returned unchanged without calling the model.
    async fn condense(&self, question: &str) -> Result<String, ChainError> {
        if self.memory.is_empty() {
            return Ok(question.to_string());
        }

        let request = self.request(prompt::condense_prompt(&self.memory.render(), question), false);
        let span = info_span!(
            "llm.condense",
            model = %request.model,
            history_turns = self.memory.len(),
        );
        let response = self.llm.complete(&request).instrument(span).await?;
        let standalone = response.content.trim();

        if standalone.is_empty() {
            tracing::warn!("model returned an empty standalone question, using the question as typed");
            return Ok(question.to_string());
        }
        tracing::debug!(standalone, "condensed follow-up question");
        Ok(standalone.to_string())
    }

    /// Warn when the prompt plus the answer budget overflows the model context.
    async fn check_context(&self, request: &CompletionRequest) {
        let max_context = self.llm.capabilities().max_context_tokens;
        match self.llm.count_tokens(request).await {
            Ok(count) if count.input_tokens.saturating_add(request.max_tokens) > max_context => {
                tracing::warn!(
                    prompt_tokens = count.input_tokens,
                    max_tokens = request.max_tokens,
                    max_context,
                    "prompt may not fit the model context window"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "token count unavailable"),
        }
    }

    #[tracing::instrument(
        name = "llm.answer",
        skip_all,
        fields(model = %self.settings.model, prompt_chars = prompt.len())
    )]
    async fn generate(
        &self,
        prompt: String,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, ChainError> {
        let request = self.request(prompt, true);
        self.check_context(&request).await;

        let mut stream = self.llm.stream(request);
        let mut answer = String::new();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text } => {
                    on_token(&text);
                    answer.push_str(&text);
                }
                StreamEvent::MessageDelta { stop_reason } => match stop_reason {
                    StopReason::MaxTokens => tracing::debug!(
                        max_tokens = self.settings.max_tokens,
                        "answer cut off at max_tokens"
                    ),
                    StopReason::ContentFilter => {
                        tracing::warn!("answer stopped by the server's content filter")
                    }
                    StopReason::EndTurn => {}
                },
                StreamEvent::Usage(usage) => {
                    tracing::debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "generation usage"
                    );
                }
                StreamEvent::Done => break,
                StreamEvent::Connected => {}
            }
        }

        Ok(answer.trim().to_string())
    }

    #[tracing::instrument(
        name = "chain.ask",
        skip_all,
        fields(question_len = question.len(), history_turns = self.memory.len())
    )]
    pub async fn ask(
        &mut self,
        question: &str,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> Result<AnswerResult, ChainError> {
        let standalone_question = self.condense(question).await?;

        let retrieved = self.retriever.retrieve(&standalone_question).await?;
        let found = retrieved.len();
        let kept = reduce_below_limit(retrieved, self.settings.max_tokens_limit);
        if kept.len() < found {
            tracing::debug!(
                found,
                kept = kept.len(),
                limit = self.settings.max_tokens_limit,
                "dropped chunks over the context token limit"
            );
        }

        let source_documents: Vec<DocumentChunk> = kept.into_iter().map(|r| r.chunk).collect();
        let qa = prompt::qa_prompt(&prompt::format_context(&source_documents), &standalone_question);
        let answer = self.generate(qa, on_token).await?;

        self.memory.push(question, answer.clone());

        Ok(AnswerResult {
            answer,
            standalone_question,
            source_documents,
        })
    }
}

impl<R: Retriever> QuestionAnswerer for ConversationalRetrievalChain<R> {
    fn ask(
        &mut self,
        question: &str,
        on_token: &mut (dyn FnMut(&str) + Send),
    ) -> impl Future<Output = Result<AnswerResult, ChainError>> {
        ConversationalRetrievalChain::ask(self, question, on_token)
    }
}
