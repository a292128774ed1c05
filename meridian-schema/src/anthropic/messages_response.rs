//! Anthropic Messages API response schema, non-stream and SSE event shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub model: String,
    pub content: Vec<AnthropicResponseBlock>,
    pub stop_reason: String,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicResponseBlock {
    Thinking { thinking: String },
    Text { text: String },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// `message_start` SSE event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessageStart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: AnthropicMessagesResponse,
}

/// `content_block_delta` SSE event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicContentBlockDelta {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub index: u32,
    pub delta: AnthropicTextDelta,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicTextDelta {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// `message_delta` SSE event payload, carries the final stop reason and usage.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessageDelta {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub delta: AnthropicStopDelta,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicStopDelta {
    pub stop_reason: String,
}
