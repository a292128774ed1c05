use serde_json::Value;
use std::collections::BTreeMap;

use meridian_schema::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicMessagesRequest,
    AnthropicSystem, CanonicalMessage, CanonicalPart, CanonicalRequest, OpenaiChatRequest,
    OpenaiMessage, OpenaiMessageContent, OpenaiStop, Role,
};

use crate::error::ApiError;

use super::Dialect;

/// Translate an inbound request body into the canonical OpenAI-shaped
/// pivot. OpenAI bodies pass through structurally; Gemini and Anthropic
/// bodies are mapped field-by-field per the gateway's dialect contract.
pub fn to_canonical(dialect: Dialect, body: Value) -> Result<CanonicalRequest, ApiError> {
    match dialect {
        Dialect::OpenAi => openai_to_canonical(body),
        Dialect::Anthropic => anthropic_to_canonical(body),
        Dialect::Gemini => gemini_to_canonical(body),
    }
}

fn openai_to_canonical(body: Value) -> Result<CanonicalRequest, ApiError> {
    let req: OpenaiChatRequest =
        serde_json::from_value(body).map_err(|e| ApiError::invalid_request(e.to_string()))?;

    let messages = req
        .messages
        .into_iter()
        .map(openai_message_to_canonical)
        .collect();

    Ok(CanonicalRequest {
        model: req.model,
        messages,
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: req.max_tokens,
        stop: req.stop.map(OpenaiStop::into_vec),
        stream: req.stream,
        tools: req.tools,
        tool_choice: req.tool_choice,
        extra: req.extra,
    })
}

fn openai_message_to_canonical(message: OpenaiMessage) -> CanonicalMessage {
    let role = Role::from_str(&message.role);
    let content = match message.content {
        Some(OpenaiMessageContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| {
                part.get("text")
                    .and_then(Value::as_str)
                    .map(|text| CanonicalPart::Text {
                        text: text.to_string(),
                    })
            })
            .collect(),
        _ => Vec::new(),
    };
    CanonicalMessage {
        role,
        content,
        tool_call_id: message.tool_call_id,
    }
}

fn anthropic_to_canonical(body: Value) -> Result<CanonicalRequest, ApiError> {
    let req: AnthropicMessagesRequest =
        serde_json::from_value(body).map_err(|e| ApiError::invalid_request(e.to_string()))?;

    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    if let Some(system) = req.system {
        let text = match system {
            AnthropicSystem::Text(text) => text,
            AnthropicSystem::Blocks(blocks) => blocks
                .into_iter()
                .map(|b| b.text)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        messages.push(CanonicalMessage {
            role: Role::System,
            content: vec![CanonicalPart::Text { text }],
            tool_call_id: None,
        });
    }

    for message in req.messages {
        messages.push(anthropic_message_to_canonical(message));
    }

    Ok(CanonicalRequest {
        model: req.model,
        messages,
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: Some(req.max_tokens),
        stop: req.stop_sequences,
        stream: req.stream,
        tools: req.tools,
        tool_choice: req.tool_choice,
        extra: req.extra,
    })
}

fn anthropic_message_to_canonical(message: AnthropicMessage) -> CanonicalMessage {
    let role = Role::from_str(&message.role);
    let content = match message.content {
        AnthropicContent::Text(text) => vec![CanonicalPart::Text { text }],
        AnthropicContent::Blocks(blocks) => blocks
            .into_iter()
            .map(|block| match block {
                AnthropicContentBlock::Text { text } => CanonicalPart::Text { text },
                AnthropicContentBlock::Image { source } => CanonicalPart::Image {
                    url: format!("data:{};base64,{}", source.media_type, source.data),
                },
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    CanonicalPart::ToolUse { id, name, input }
                }
                AnthropicContentBlock::ToolResult {
                    tool_use_id,
                    content,
                } => CanonicalPart::ToolResult {
                    tool_use_id,
                    content: content.map(|v| v.to_string()).unwrap_or_default(),
                },
            })
            .collect(),
    };
    CanonicalMessage {
        role,
        content,
        tool_call_id: None,
    }
}

fn gemini_to_canonical(body: Value) -> Result<CanonicalRequest, ApiError> {
    let req: meridian_schema::gemini::GeminiGenerateContentRequest =
        serde_json::from_value(body).map_err(|e| ApiError::invalid_request(e.to_string()))?;

    let mut messages = Vec::with_capacity(req.contents.len() + 1);
    if let Some(system) = req.system_instruction {
        let text = system
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            messages.push(CanonicalMessage {
                role: Role::System,
                content: vec![CanonicalPart::Text { text }],
                tool_call_id: None,
            });
        }
    }

    for content in req.contents {
        let role = match content.role.as_deref() {
            Some("model") => Role::Assistant,
            _ => Role::User,
        };
        let parts = content
            .parts
            .into_iter()
            .filter_map(|part| part.text.map(|text| CanonicalPart::Text { text }))
            .collect();
        messages.push(CanonicalMessage {
            role,
            content: parts,
            tool_call_id: None,
        });
    }

    let (temperature, top_p, max_tokens, stop) = match req.generation_config {
        Some(gc) => (
            gc.temperature.map(|v| v as f32),
            gc.top_p.map(|v| v as f32),
            gc.max_output_tokens,
            gc.extra
                .get("stopSequences")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                }),
        ),
        None => (None, None, None, None),
    };

    Ok(CanonicalRequest {
        model: String::new(),
        messages,
        temperature,
        top_p,
        max_tokens,
        stop,
        stream: false,
        tools: None,
        tool_choice: None,
        extra: BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_passthrough_preserves_messages() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hello"}]
        });
        let canonical = to_canonical(Dialect::OpenAi, body).unwrap();
        assert_eq!(canonical.model, "gpt-4o");
        assert_eq!(canonical.messages.len(), 1);
        assert_eq!(canonical.messages[0].role, Role::User);
    }

    #[test]
    fn anthropic_system_becomes_leading_system_message() {
        let body = json!({
            "model": "claude-sonnet-4-5",
            "max_tokens": 16,
            "system": "Be brief",
            "messages": [{"role": "user", "content": "hi"}]
        });
        let canonical = to_canonical(Dialect::Anthropic, body).unwrap();
        assert_eq!(canonical.messages[0].role, Role::System);
        assert_eq!(canonical.messages[1].role, Role::User);
    }

    #[test]
    fn gemini_model_role_maps_to_assistant() {
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello"}]}
            ]
        });
        let canonical = to_canonical(Dialect::Gemini, body).unwrap();
        assert_eq!(canonical.messages[1].role, Role::Assistant);
    }
}
