//! LlmProvider trait definition.
//!
//! Uses RPITIT for `complete` and `count_tokens`, and `Pin<Box<dyn Stream>>`
//! for `stream` so the trait can sit behind `BoxLlmProvider`.

use std::pin::Pin;

use futures_util::Stream;

use docchat_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent, TokenCount,
};

/// Events of one streamed generation, owned independently of the provider.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// A text generation backend.
///
/// Implementations live in docchat-infra (e.g. `OpenAiCompatibleProvider`
/// talking to a local `llama-server`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "llama-server").
    fn name(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Text arrives as
    /// [`StreamEvent::TextDelta`] events in generation order.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> EventStream;

    /// Estimate the prompt size of a request without sending it.
    fn count_tokens(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<TokenCount, LlmError>> + Send;
}
