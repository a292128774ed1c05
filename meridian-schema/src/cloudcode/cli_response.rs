use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::gemini::{Candidate, GeminiResponseBody};

/// Generic CLI envelope wrapper.
#[derive(Debug, Deserialize)]
pub struct CloudCodeResponseBody {
    #[serde(rename = "response")]
    pub inner: CloudCodeResponseObject,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
pub struct CloudCodeResponseObject {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub promptFeedback: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usageMetadata: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modelVersion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responseId: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub createTime: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<CloudCodeResponseBody> for GeminiResponseBody {
    fn from(body: CloudCodeResponseBody) -> Self {
        let inner = body.inner;
        GeminiResponseBody {
            candidates: inner.candidates,
            promptFeedback: inner.promptFeedback,
            usageMetadata: inner.usageMetadata,
            modelVersion: inner.modelVersion,
            responseId: inner.responseId,
            extra: inner.extra,
        }
    }
}
