use bytes::Bytes;
use meridian_schema::{
    AnthropicContentBlockDelta, AnthropicMessageDelta, AnthropicMessageStart,
    AnthropicMessagesResponse, AnthropicResponseBlock, AnthropicStopDelta, AnthropicTextDelta,
    AnthropicUsage, CanonicalChunk, OpenaiChatChunk, OpenaiChunkChoice, OpenaiChunkDelta,
    OpenaiUsage,
};

use crate::error::ApiError;

use super::{
    Dialect,
    response::{anthropic_stop_reason, gemini_finish_reason, openai_finish_reason},
};

/// Per-dialect incremental translator: consumes canonical stream chunks and
/// emits dialect-framed SSE events, including the terminator contract
/// (`data: [DONE]` for OpenAI, `message_stop` for Anthropic, the final
/// bare JSON object for Gemini's newline-delimited stream).
pub struct StreamTranslator {
    dialect: Dialect,
    id: String,
    model: String,
    created: i64,
    sent_head: bool,
}

impl StreamTranslator {
    pub fn new(dialect: Dialect, id: String, model: String, created: i64) -> Self {
        Self {
            dialect,
            id,
            model,
            created,
            sent_head: false,
        }
    }

    /// Translate one canonical chunk into zero or more dialect-framed SSE
    /// lines (each already terminated with `\n\n`).
    pub fn translate(&mut self, chunk: &CanonicalChunk) -> Bytes {
        match self.dialect {
            Dialect::OpenAi => self.openai_chunk(chunk),
            Dialect::Anthropic => self.anthropic_chunk(chunk),
            Dialect::Gemini => self.gemini_chunk(chunk),
        }
    }

    /// Emit a dialect-framed error event for a failure discovered mid-stream
    /// (e.g. the upstream connection dropped before it sent a natural end).
    /// Callers still follow this with `terminate()` so the stream closes on
    /// the dialect's usual contract.
    pub fn error_event(&self, err: &ApiError) -> Bytes {
        match self.dialect {
            Dialect::OpenAi => data_line(&serde_json::json!({
                "error": {
                    "message": err.message,
                    "type": err.kind.code_str(),
                    "code": err.http_status().as_u16(),
                }
            })),
            Dialect::Anthropic => sse_event(
                "error",
                &serde_json::json!({
                    "type": "error",
                    "error": {
                        "type": err.kind.code_str(),
                        "message": err.message,
                    }
                }),
            ),
            Dialect::Gemini => {
                let payload = serde_json::json!({
                    "error": {
                        "code": err.http_status().as_u16(),
                        "message": err.message,
                        "status": err.kind.code_str().to_uppercase(),
                    }
                });
                let mut line = serde_json::to_vec(&payload).expect("value always serializes");
                line.push(b'\n');
                Bytes::from(line)
            }
        }
    }

    /// Emit the dialect's terminator event(s), called once the upstream
    /// stream ends (success or error alike).
    pub fn terminate(&mut self) -> Bytes {
        match self.dialect {
            Dialect::OpenAi => Bytes::from_static(b"data: [DONE]\n\n"),
            Dialect::Anthropic => {
                sse_event("message_stop", &serde_json::json!({"type": "message_stop"}))
            }
            Dialect::Gemini => Bytes::new(),
        }
    }

    fn openai_chunk(&mut self, chunk: &CanonicalChunk) -> Bytes {
        let delta = OpenaiChunkDelta {
            role: (!self.sent_head).then(|| {
                self.sent_head = true;
                "assistant".to_string()
            }),
            content: chunk.delta_text.clone(),
            reasoning_content: chunk.delta_reasoning.clone(),
        };
        let payload = OpenaiChatChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![OpenaiChunkChoice {
                index: 0,
                delta,
                finish_reason: chunk.finish_reason.map(openai_finish_reason).map(str::to_string),
            }],
            usage: chunk.usage.map(|u| OpenaiUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total(),
            }),
        };
        data_line(&payload)
    }

    fn anthropic_chunk(&mut self, chunk: &CanonicalChunk) -> Bytes {
        if !self.sent_head {
            self.sent_head = true;
            let message = AnthropicMessagesResponse {
                id: self.id.clone(),
                kind: "message".to_string(),
                role: "assistant".to_string(),
                model: self.model.clone(),
                content: vec![AnthropicResponseBlock::Text {
                    text: String::new(),
                }],
                stop_reason: String::new(),
                usage: AnthropicUsage::default(),
            };
            let start = AnthropicMessageStart {
                kind: "message_start",
                message,
            };
            return sse_event("message_start", &start);
        }

        if let Some(text) = &chunk.delta_text {
            let delta = AnthropicContentBlockDelta {
                kind: "content_block_delta",
                index: 0,
                delta: AnthropicTextDelta {
                    kind: "text_delta",
                    text: text.clone(),
                },
            };
            return sse_event("content_block_delta", &delta);
        }

        if let Some(reason) = chunk.finish_reason {
            let usage = chunk
                .usage
                .map(|u| AnthropicUsage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default();
            let delta = AnthropicMessageDelta {
                kind: "message_delta",
                delta: AnthropicStopDelta {
                    stop_reason: anthropic_stop_reason(reason).to_string(),
                },
                usage,
            };
            return sse_event("message_delta", &delta);
        }

        Bytes::new()
    }

    fn gemini_chunk(&mut self, chunk: &CanonicalChunk) -> Bytes {
        let text = chunk.delta_text.clone().unwrap_or_default();
        let payload = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": chunk.finish_reason.map(gemini_finish_reason),
                "index": 0,
            }],
            "usageMetadata": chunk.usage.map(|u| serde_json::json!({
                "promptTokenCount": u.prompt_tokens,
                "candidatesTokenCount": u.completion_tokens,
                "totalTokenCount": u.total(),
            })),
        });
        let mut line = serde_json::to_vec(&payload).expect("value always serializes");
        line.push(b'\n');
        Bytes::from(line)
    }
}

fn sse_event(event: &str, payload: &impl serde::Serialize) -> Bytes {
    let body = serde_json::to_string(payload).expect("value always serializes");
    Bytes::from(format!("event: {event}\ndata: {body}\n\n"))
}

fn data_line(payload: &impl serde::Serialize) -> Bytes {
    let body = serde_json::to_string(payload).expect("value always serializes");
    Bytes::from(format!("data: {body}\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_schema::FinishReason;

    #[test]
    fn openai_stream_emits_data_lines_and_done() {
        let mut t = StreamTranslator::new(Dialect::OpenAi, "id-1".into(), "gpt-4o".into(), 0);
        let chunk = CanonicalChunk {
            delta_text: Some("hi".into()),
            ..Default::default()
        };
        let bytes = t.translate(&chunk);
        assert!(String::from_utf8_lossy(&bytes).starts_with("data: "));
        let done = t.terminate();
        assert_eq!(done.as_ref(), b"data: [DONE]\n\n");
    }

    #[test]
    fn anthropic_stream_starts_with_message_start() {
        let mut t = StreamTranslator::new(Dialect::Anthropic, "id-1".into(), "claude".into(), 0);
        let bytes = t.translate(&CanonicalChunk::default());
        assert!(String::from_utf8_lossy(&bytes).contains("message_start"));
    }

    #[test]
    fn gemini_stream_emits_bare_json_lines() {
        let mut t = StreamTranslator::new(Dialect::Gemini, "id-1".into(), "gemini-2.5-pro".into(), 0);
        let chunk = CanonicalChunk {
            delta_text: Some("hi".into()),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        };
        let bytes = t.translate(&chunk);
        assert!(bytes.ends_with(b"\n"));
        assert!(String::from_utf8_lossy(&bytes).contains("STOP"));
    }
}
