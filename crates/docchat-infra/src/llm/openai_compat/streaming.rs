//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum defined in `docchat-types`.

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use docchat_core::llm::provider::EventStream;
use docchat_types::llm::{LlmError, StreamEvent, Usage};

use super::map_finish_reason;

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of [`StreamEvent`]s.
///
/// Events arrive in this order:
/// 1. `Connected` once, on entry
/// 2. `TextDelta` for each non-empty content fragment
/// 3. `MessageDelta` when a finish reason appears
/// 4. `Usage` if the server reports it (llama-server does with `include_usage`)
/// 5. `Done` at the end
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> EventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            for choice in &chunk.choices {
                if let Some(text) = &choice.delta.content {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text: text.clone() };
                    }
                }

                if let Some(reason) = &choice.finish_reason {
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(reason),
                    };
                }
            }

            // The final chunk carries usage with an empty choices array.
            if let Some(usage) = &chunk.usage {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }
        }

        yield StreamEvent::Done;
    })
}
