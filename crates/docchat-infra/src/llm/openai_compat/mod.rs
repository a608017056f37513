//! OpenAI-compatible LLM provider.
//!
//! `llama-server`, the GPT4All chat server and Ollama all expose
//! `/v1/chat/completions`, so one [`OpenAiCompatibleProvider`] covers every
//! local backend. Uses [`async_openai`] for request types and SSE streaming.

pub mod config;
pub mod streaming;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, FinishReason,
};
use async_openai::Client;

use docchat_core::llm::provider::{EventStream, LlmProvider};
use docchat_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, ProviderCapabilities,
    StopReason, StreamEvent, TokenCount, Usage,
};

use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;

/// Provider for any server speaking the OpenAI chat completions protocol.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
            capabilities: config.capabilities,
        }
    }

    /// Provider for a `llama-server` we spawned on `port`.
    pub fn llama_server(port: u16, model: &str, n_ctx: u32) -> Self {
        Self::new(config::llama_server_defaults(port, model, n_ctx))
    }

    /// Provider for a server that is already running at `base_url`.
    pub fn external(base_url: &str, model: &str, n_ctx: u32) -> Self {
        Self::new(config::external_server_defaults(base_url, model, n_ctx))
    }

    fn to_openai_message(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    refusal: None,
                    name: None,
                    audio: None,
                    tool_calls: None,
                    function_call: None,
                })
            }
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidRequest(
                "completion request has no messages".to_string(),
            ));
        }

        let messages = request.messages.iter().map(Self::to_openai_message).collect();

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        // llama.cpp and GPT4All read the older `max_tokens` field.
        #[allow(deprecated)]
        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        Ok(req)
    }
}

pub(crate) fn map_finish_reason(reason: &FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::ContentFilter => StopReason::ContentFilter,
        // No tools are sent.
        FinishReason::ToolCalls | FinishReason::FunctionCall => StopReason::EndTurn,
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request, false)?;
        let n_ctx = self.capabilities.max_context_tokens;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(|e| map_openai_error(e, n_ctx))?;

        let first = response.choices.first();
        let content = first
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let stop_reason = first
            .and_then(|c| c.finish_reason.as_ref())
            .map(map_finish_reason)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> EventStream {
        let oai_request = match self.build_request(&request, true) {
            Ok(req) => req,
            Err(e) => {
                return Box::pin(futures_util::stream::once(async move { Err(e) }));
            }
        };

        let client = self.client.clone();
        let n_ctx = self.capabilities.max_context_tokens;

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(|e| map_openai_error(e, n_ctx))?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }

    async fn count_tokens(&self, request: &CompletionRequest) -> Result<TokenCount, LlmError> {
        // ~4 characters per token, plus a little per message for the chat template.
        let total_chars: usize = request
            .messages
            .iter()
            .map(|msg| msg.content.chars().count() + 10)
            .sum();

        Ok(TokenCount {
            input_tokens: total_chars.div_ceil(4) as u32,
        })
    }
}

/// Token count quoted in llama-server's overflow message, e.g.
/// `request (2300 tokens) exceeds the available context size (2048 tokens)`.
fn requested_tokens(message: &str) -> Option<u32> {
    let (_, rest) = message.split_once('(')?;
    rest.split_whitespace().next()?.parse().ok()
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`]. `n_ctx` is
/// reported as the limit when the server rejects an oversized prompt.
fn map_openai_error(err: async_openai::error::OpenAIError, n_ctx: u32) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "context_length_exceeded"
                || error_type == "exceed_context_size_error"
                || api_err.message.contains("maximum context length")
                || api_err.message.contains("exceeds the available context size")
            {
                LlmError::ContextLengthExceeded {
                    max: n_ctx,
                    requested: requested_tokens(&api_err.message).unwrap_or(0),
                }
            } else if error_type == "unavailable_error" {
                LlmError::ServerUnavailable(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => {
            if reqwest_err.is_connect() {
                LlmError::ServerUnavailable(err.to_string())
            } else if let Some(status) = reqwest_err.status() {
                match status.as_u16() {
                    503 => LlmError::ServerUnavailable(err.to_string()),
                    _ => LlmError::Provider {
                        message: err.to_string(),
                    },
                }
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: "gpt4all-j".to_string(),
            messages,
            max_tokens: 256,
            temperature: Some(0.7),
            stream: false,
        }
    }

    #[test]
    fn test_llama_server_factory() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        assert_eq!(provider.name(), "llama-server");
        assert_eq!(provider.model, "gpt4all-j");
        assert!(provider.capabilities().streaming);
        assert_eq!(provider.capabilities().max_context_tokens, 2048);
    }

    #[test]
    fn test_external_factory() {
        let provider =
            OpenAiCompatibleProvider::external("http://127.0.0.1:4891/v1", "gpt4all-j", 2048);
        assert_eq!(provider.name(), "openai-compatible");
    }

    #[test]
    #[allow(deprecated)]
    fn test_build_request_messages() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        let req = request(vec![
            Message {
                role: MessageRole::System,
                content: "Answer briefly".to_string(),
            },
            Message::user("Where can I eat?"),
            Message {
                role: MessageRole::Assistant,
                content: "Try Mikla.".to_string(),
            },
        ]);

        let oai_req = provider.build_request(&req, false).unwrap();
        assert_eq!(oai_req.model, "gpt4all-j");
        assert_eq!(oai_req.messages.len(), 3);
        assert_eq!(oai_req.max_tokens, Some(256));
        assert_eq!(oai_req.max_completion_tokens, Some(256));
        assert!(oai_req.stream.is_none());
        assert!(oai_req.stream_options.is_none());
    }

    #[test]
    fn test_build_request_streaming_asks_for_usage() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        let oai_req = provider
            .build_request(&request(vec![Message::user("hi")]), true)
            .unwrap();
        assert_eq!(oai_req.stream, Some(true));
        let opts = oai_req.stream_options.unwrap();
        assert_eq!(opts.include_usage, Some(true));
    }

    #[test]
    fn test_build_request_empty_model_uses_default() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        let mut req = request(vec![Message::user("hi")]);
        req.model = String::new();
        let oai_req = provider.build_request(&req, false).unwrap();
        assert_eq!(oai_req.model, "gpt4all-j");
    }

    #[test]
    fn test_build_request_without_messages_is_rejected() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        let err = provider.build_request(&request(Vec::new()), false).unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_count_tokens_estimation() {
        let provider = OpenAiCompatibleProvider::llama_server(8080, "gpt4all-j", 2048);
        // 30 chars + 10 overhead = 40 chars = 10 tokens
        let req = request(vec![Message::user("x".repeat(30))]);
        let count = provider.count_tokens(&req).await.unwrap();
        assert_eq!(count.input_tokens, 10);
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(&FinishReason::Stop), StopReason::EndTurn);
        assert_eq!(map_finish_reason(&FinishReason::Length), StopReason::MaxTokens);
        assert_eq!(
            map_finish_reason(&FinishReason::ContentFilter),
            StopReason::ContentFilter
        );
        assert_eq!(map_finish_reason(&FinishReason::ToolCalls), StopReason::EndTurn);
    }

    #[test]
    fn test_map_openai_error_context_length() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "request (2300 tokens) exceeds the available context size (2048 tokens), \
                      try increasing it"
                .to_string(),
            r#type: Some("exceed_context_size_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err), 2048);
        assert!(matches!(
            err,
            LlmError::ContextLengthExceeded {
                max: 2048,
                requested: 2300
            }
        ));
    }

    #[test]
    fn test_requested_tokens_parse() {
        assert_eq!(requested_tokens("request (512 tokens) exceeds"), Some(512));
        assert_eq!(requested_tokens("maximum context length exceeded"), None);
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()), 2048);
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
