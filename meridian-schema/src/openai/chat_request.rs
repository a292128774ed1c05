//! OpenAI chat-completions request schema for `POST /v1/chat/completions`.
//!
//! Schema reference: https://platform.openai.com/docs/api-reference/chat/create
//!
//! `extra` collects unknown/new fields so deserialization doesn't break when
//! OpenAI extends the schema.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenaiChatRequest {
    #[serde(default)]
    pub model: String,

    pub messages: Vec<OpenaiMessage>,

    #[serde(default)]
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<OpenaiStop>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenaiStop {
    One(String),
    Many(Vec<String>),
}

impl OpenaiStop {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OpenaiStop::One(s) => vec![s],
            OpenaiStop::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenaiMessage {
    pub role: String,

    #[serde(
        default,
        deserialize_with = "deserialize_message_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<OpenaiMessageContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenaiMessageContent {
    Null(()),
    Parts(Vec<Value>),
}

fn deserialize_message_content<'de, D>(
    deserializer: D,
) -> Result<Option<OpenaiMessageContent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawContent {
        Null(()),
        String(String),
        Array(Vec<Value>),
    }

    let raw = RawContent::deserialize(deserializer)?;
    let normalized = match raw {
        RawContent::Null(()) => OpenaiMessageContent::Null(()),
        RawContent::String(s) => {
            OpenaiMessageContent::Parts(vec![json!({"type": "text", "text": s})])
        }
        RawContent::Array(arr) => OpenaiMessageContent::Parts(arr),
    };
    Ok(Some(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_string_content_to_text_part() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gemini-2.5-flash",
            "messages": [{"role": "user", "content": "hi"}],
        }))
        .unwrap();

        assert_eq!(
            req.messages[0].content,
            Some(OpenaiMessageContent::Parts(vec![
                json!({"type": "text", "text": "hi"})
            ]))
        );
    }

    #[test]
    fn accepts_array_content() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gemini-2.5-flash",
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": "hi"}, {"type": "image_url", "image_url": {"url": "data:..."}}]
            }],
        }))
        .unwrap();

        let OpenaiMessageContent::Parts(parts) = req.messages[0].content.clone().unwrap() else {
            panic!("expected Parts");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn stop_accepts_string_or_array() {
        let single: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "m", "messages": [], "stop": "END"
        }))
        .unwrap();
        assert_eq!(single.stop, Some(OpenaiStop::One("END".to_string())));

        let many: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "m", "messages": [], "stop": ["A", "B"]
        }))
        .unwrap();
        assert_eq!(
            many.stop,
            Some(OpenaiStop::Many(vec!["A".to_string(), "B".to_string()]))
        );
    }

    #[test]
    fn collects_unknown_fields_via_flatten() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "m", "messages": [], "user": "abc123"
        }))
        .unwrap();
        assert_eq!(req.extra.get("user"), Some(&json!("abc123")));
    }
}
