use serde_json::{Value, json};

use meridian_schema::{
    AnthropicMessagesResponse, AnthropicResponseBlock, AnthropicUsage, CanonicalResponse,
    FinishReason, OpenaiChatResponse, OpenaiChoice, OpenaiResponseMessage, OpenaiUsage,
};

use super::Dialect;

/// Translate a canonical (OpenAI-shaped) non-stream response into the
/// caller's dialect.
pub fn from_canonical(dialect: Dialect, id: String, created: i64, response: CanonicalResponse) -> Value {
    match dialect {
        Dialect::OpenAi => serde_json::to_value(openai_response(id, created, response))
            .expect("OpenaiChatResponse always serializes"),
        Dialect::Anthropic => serde_json::to_value(anthropic_response(id, response))
            .expect("AnthropicMessagesResponse always serializes"),
        Dialect::Gemini => gemini_response(response),
    }
}

fn openai_response(id: String, created: i64, response: CanonicalResponse) -> OpenaiChatResponse {
    OpenaiChatResponse {
        id,
        object: "chat.completion".to_string(),
        created,
        model: response.model,
        choices: vec![OpenaiChoice {
            index: 0,
            message: OpenaiResponseMessage {
                role: "assistant".to_string(),
                content: response.choice.content,
                reasoning_content: response.choice.reasoning_content,
            },
            finish_reason: openai_finish_reason(response.choice.finish_reason).to_string(),
        }],
        usage: OpenaiUsage {
            prompt_tokens: response.usage.prompt_tokens,
            completion_tokens: response.usage.completion_tokens,
            total_tokens: response.usage.total(),
        },
    }
}

fn anthropic_response(id: String, response: CanonicalResponse) -> AnthropicMessagesResponse {
    let mut content = Vec::new();
    if let Some(thinking) = response.choice.reasoning_content {
        content.push(AnthropicResponseBlock::Thinking { thinking });
    }
    content.push(AnthropicResponseBlock::Text {
        text: response.choice.content,
    });

    AnthropicMessagesResponse {
        id,
        kind: "message".to_string(),
        role: "assistant".to_string(),
        model: response.model,
        content,
        stop_reason: anthropic_stop_reason(response.choice.finish_reason).to_string(),
        usage: AnthropicUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        },
    }
}

fn gemini_response(response: CanonicalResponse) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": response.choice.content}],
            },
            "finishReason": gemini_finish_reason(response.choice.finish_reason),
            "index": 0,
        }],
        "usageMetadata": {
            "promptTokenCount": response.usage.prompt_tokens,
            "candidatesTokenCount": response.usage.completion_tokens,
            "totalTokenCount": response.usage.total(),
        },
        "modelVersion": response.model,
    })
}

pub(super) fn openai_finish_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::ToolCalls => "tool_calls",
    }
}

pub(super) fn anthropic_stop_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "end_turn",
        FinishReason::Length => "max_tokens",
        FinishReason::ContentFilter => "stop_sequence",
        FinishReason::ToolCalls => "tool_use",
    }
}

pub(super) fn gemini_finish_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "STOP",
        FinishReason::Length => "MAX_TOKENS",
        FinishReason::ContentFilter => "SAFETY",
        FinishReason::ToolCalls => "STOP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_schema::{CanonicalChoice, CanonicalUsage};

    fn sample() -> CanonicalResponse {
        CanonicalResponse {
            model: "gemini-2.5-pro".to_string(),
            choice: CanonicalChoice {
                content: "hello".to_string(),
                reasoning_content: None,
                finish_reason: FinishReason::Stop,
            },
            usage: CanonicalUsage {
                prompt_tokens: 3,
                completion_tokens: 5,
            },
        }
    }

    #[test]
    fn openai_shape_has_choices() {
        let v = from_canonical(Dialect::OpenAi, "id-1".into(), 0, sample());
        assert_eq!(v["choices"][0]["message"]["content"], "hello");
        assert_eq!(v["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn anthropic_shape_has_content_blocks() {
        let v = from_canonical(Dialect::Anthropic, "id-1".into(), 0, sample());
        assert_eq!(v["content"][0]["text"], "hello");
        assert_eq!(v["stop_reason"], "end_turn");
    }

    #[test]
    fn gemini_shape_has_candidates() {
        let v = from_canonical(Dialect::Gemini, "id-1".into(), 0, sample());
        assert_eq!(v["candidates"][0]["content"]["parts"][0]["text"], "hello");
        assert_eq!(v["candidates"][0]["finishReason"], "STOP");
    }
}
