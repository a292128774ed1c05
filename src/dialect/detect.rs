use serde_json::Value;

/// Wire dialect of an inbound or outbound request, detected from the
/// request body shape rather than the route path so all three dialect
/// families can share the same detection logic in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenAi,
    Gemini,
    Anthropic,
}

/// Detect the dialect of an inbound request body.
///
/// Order of checks: Gemini's `contents`/`systemInstruction`/
/// `generationConfig` shape is the most distinctive and is checked first;
/// Anthropic's `messages` + (`system` as string/array, or any content
/// block typed `text`/`image`/`tool_use`/`tool_result`) is checked next;
/// anything else is treated as OpenAI chat-completions.
pub fn detect(body: &Value) -> Dialect {
    if looks_like_gemini(body) {
        return Dialect::Gemini;
    }
    if looks_like_anthropic(body) {
        return Dialect::Anthropic;
    }
    Dialect::OpenAi
}

fn looks_like_gemini(body: &Value) -> bool {
    body.get("contents").is_some_and(Value::is_array)
        || body.get("systemInstruction").is_some()
        || body.get("generationConfig").is_some()
}

fn looks_like_anthropic(body: &Value) -> bool {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return false;
    };

    let system_shaped = match body.get("system") {
        Some(Value::String(_)) => true,
        Some(Value::Array(_)) => true,
        _ => false,
    };
    if system_shaped {
        return true;
    }

    messages.iter().any(|message| {
        message
            .get("content")
            .and_then(Value::as_array)
            .is_some_and(|blocks| {
                blocks.iter().any(|block| {
                    matches!(
                        block.get("type").and_then(Value::as_str),
                        Some("text" | "image" | "tool_use" | "tool_result")
                    )
                })
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_gemini_by_contents() {
        let body = json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]});
        assert_eq!(detect(&body), Dialect::Gemini);
    }

    #[test]
    fn detects_anthropic_by_system_string() {
        let body = json!({
            "model": "claude-sonnet-4-5",
            "system": "Be brief",
            "messages": [{"role": "user", "content": "hi"}]
        });
        assert_eq!(detect(&body), Dialect::Anthropic);
    }

    #[test]
    fn detects_anthropic_by_content_block_type() {
        let body = json!({
            "model": "claude-sonnet-4-5",
            "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
        });
        assert_eq!(detect(&body), Dialect::Anthropic);
    }

    #[test]
    fn defaults_to_openai() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}]
        });
        assert_eq!(detect(&body), Dialect::OpenAi);
    }
}
