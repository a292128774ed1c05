//! Canonical <-> Gemini-shaped upstream request/response conversion. The
//! Cloud Code and Antigravity families both speak this wire shape (wrapped
//! in their own envelopes), so the conversion lives once here rather than
//! duplicated in `cloudcode.rs`/`antigravity.rs`.

use meridian_schema::gemini::{Content, GeminiGenerateContentRequest, GeminiResponseBody, GenerationConfig, Part};
use meridian_schema::{CanonicalChunk, CanonicalPart, CanonicalRequest, CanonicalResponse, FinishReason, Role};
use serde_json::json;

pub fn canonical_to_gemini(req: &CanonicalRequest) -> GeminiGenerateContentRequest {
    let mut contents = Vec::with_capacity(req.messages.len());
    let mut system_parts: Vec<Part> = Vec::new();

    for message in &req.messages {
        let parts: Vec<Part> = message.content.iter().map(canonical_part_to_gemini).collect();
        if message.role == Role::System {
            system_parts.extend(parts);
            continue;
        }
        let role = match message.role {
            Role::Assistant => "model",
            _ => "user",
        };
        contents.push(Content {
            role: Some(role.to_string()),
            parts,
            extra: Default::default(),
        });
    }

    let system_instruction = (!system_parts.is_empty()).then(|| Content {
        role: None,
        parts: system_parts,
        extra: Default::default(),
    });

    let generation_config = (req.temperature.is_some()
        || req.top_p.is_some()
        || req.max_tokens.is_some()
        || req.stop.is_some())
    .then(|| GenerationConfig {
        temperature: req.temperature.map(f64::from),
        top_p: req.top_p.map(f64::from),
        top_k: None,
        max_output_tokens: req.max_tokens,
        thinking_config: None,
        image_config: None,
        extra: req
            .stop
            .clone()
            .map(|stop| {
                let mut extra = std::collections::BTreeMap::new();
                extra.insert("stopSequences".to_string(), json!(stop));
                extra
            })
            .unwrap_or_default(),
    });

    GeminiGenerateContentRequest {
        contents,
        system_instruction,
        generation_config,
        tools: None,
        tool_config: None,
        extra: Default::default(),
    }
}

fn canonical_part_to_gemini(part: &CanonicalPart) -> Part {
    match part {
        CanonicalPart::Text { text } => Part {
            text: Some(text.clone()),
            ..Part::default()
        },
        CanonicalPart::Image { url } => Part {
            file_data: Some(json!({"fileUri": url})),
            ..Part::default()
        },
        CanonicalPart::ToolUse { name, input, .. } => Part {
            function_call: Some(json!({"name": name, "args": input})),
            ..Part::default()
        },
        CanonicalPart::ToolResult { tool_use_id, content } => Part {
            function_response: Some(json!({"name": tool_use_id, "response": {"content": content}})),
            ..Part::default()
        },
    }
}

/// Convert a complete upstream response into the canonical non-stream shape.
pub fn gemini_response_to_canonical(model: String, body: GeminiResponseBody) -> CanonicalResponse {
    let candidate = body.candidates.into_iter().next();
    let (content, reasoning, finish_reason) = match candidate {
        Some(candidate) => {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            let text = join_text_parts(&parts, false);
            let reasoning = join_text_parts(&parts, true);
            let finish_reason = map_finish_reason(candidate.finish_reason.as_deref());
            (text, (!reasoning.is_empty()).then_some(reasoning), finish_reason)
        }
        None => (String::new(), None, FinishReason::Stop),
    };

    CanonicalResponse {
        model,
        choice: meridian_schema::CanonicalChoice {
            content,
            reasoning_content: reasoning,
            finish_reason,
        },
        usage: extract_usage(body.usageMetadata.as_ref()),
    }
}

/// Convert one line of a newline-delimited upstream stream into a canonical
/// delta chunk.
pub fn gemini_response_to_chunk(body: GeminiResponseBody) -> CanonicalChunk {
    let candidate = body.candidates.into_iter().next();
    let Some(candidate) = candidate else {
        return CanonicalChunk::default();
    };
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let text = join_text_parts(&parts, false);
    let reasoning = join_text_parts(&parts, true);

    CanonicalChunk {
        delta_text: (!text.is_empty()).then_some(text),
        delta_reasoning: (!reasoning.is_empty()).then_some(reasoning),
        finish_reason: candidate.finish_reason.as_deref().map(|r| map_finish_reason(Some(r))),
        usage: Some(extract_usage(body.usageMetadata.as_ref())),
    }
}

fn join_text_parts(parts: &[Part], thoughts_only: bool) -> String {
    parts
        .iter()
        .filter(|p| p.thought.unwrap_or(false) == thoughts_only)
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Stop,
    }
}

fn extract_usage(usage: Option<&serde_json::Value>) -> meridian_schema::CanonicalUsage {
    let Some(usage) = usage else {
        return meridian_schema::CanonicalUsage::default();
    };
    meridian_schema::CanonicalUsage {
        prompt_tokens: usage.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: usage
            .get("candidatesTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_schema::CanonicalMessage;

    #[test]
    fn system_message_becomes_system_instruction() {
        let req = CanonicalRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: vec![
                CanonicalMessage {
                    role: Role::System,
                    content: vec![CanonicalPart::Text { text: "be brief".into() }],
                    tool_call_id: None,
                },
                CanonicalMessage {
                    role: Role::User,
                    content: vec![CanonicalPart::Text { text: "hi".into() }],
                    tool_call_id: None,
                },
            ],
            ..Default::default()
        };
        let gemini = canonical_to_gemini(&req);
        assert_eq!(gemini.contents.len(), 1);
        assert_eq!(gemini.contents[0].role.as_deref(), Some("user"));
        assert_eq!(
            gemini.system_instruction.unwrap().parts[0].text.as_deref(),
            Some("be brief")
        );
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let body = GeminiResponseBody {
            candidates: vec![],
            promptFeedback: None,
            usageMetadata: None,
            modelVersion: None,
            responseId: None,
            extra: Default::default(),
        };
        let response = gemini_response_to_canonical("gemini-2.5-pro".to_string(), body);
        assert_eq!(response.choice.content, "");
    }
}
