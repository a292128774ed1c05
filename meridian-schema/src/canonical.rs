//! The internal canonical request/response shape every dialect adapter
//! converges on. Shaped after OpenAI's chat-completions schema per
//! the dialect adapters' design: both Gemini and Anthropic requests are
//! canonicalized into this before dispatch, and dispatched responses are
//! de-canonicalized back out of it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Parse a role string from any of the three dialects, defaulting to
    /// `User` for anything unrecognized rather than rejecting the request.
    pub fn from_str(role: &str) -> Self {
        match role {
            "system" => Role::System,
            "assistant" | "model" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub role: Role,
    pub content: Vec<CanonicalPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalPart {
    Text { text: String },
    Image { url: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalRequest {
    pub model: String,
    pub messages: Vec<CanonicalMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Fields a dialect adapter accepted but the canonical schema does not
    /// model explicitly; carried through untouched so round-tripping does
    /// not drop information the caller sent.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CanonicalUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl CanonicalUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone)]
pub struct CanonicalChoice {
    pub content: String,
    pub reasoning_content: Option<String>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone)]
pub struct CanonicalResponse {
    pub model: String,
    pub choice: CanonicalChoice,
    pub usage: CanonicalUsage,
}

/// One incremental delta of a streamed canonical response.
#[derive(Debug, Clone, Default)]
pub struct CanonicalChunk {
    pub delta_text: Option<String>,
    pub delta_reasoning: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<CanonicalUsage>,
}
