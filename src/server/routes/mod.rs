pub mod anthropic;
pub mod gemini;
pub mod googleai;
pub mod health;
pub mod openai;

use axum::{Json, RequestExt};
use axum::extract::{FromRequest, Path, Request};
use serde_json::Value;

use crate::error::ApiError;

/// Parsed from a Gemini/Cloud-Code-native wildcard path (`models/{model}:{rpc}`)
/// plus its JSON body in one extraction pass, since a request's body can only
/// be consumed once. The model name has any `:rpc` suffix split off;
/// `stream` is true when the RPC suffix named the streaming call. Shared by
/// the Gemini-native and Cloud-Code-native routes, which both use this URL
/// shape (`spec.md` §6).
pub struct NativeRequest {
    pub model: String,
    pub stream: bool,
    pub body: Value,
}

impl<S> FromRequest<S> for NativeRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(mut req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Path(path) = req
            .extract_parts::<Path<String>>()
            .await
            .map_err(|_| ApiError::invalid_request("Missing model path segment."))?;

        let last_segment = path
            .split('/')
            .next_back()
            .ok_or_else(|| ApiError::invalid_request("Missing model path segment."))?;

        let (model, rpc) = match last_segment.split_once(':') {
            Some((model, rpc)) => (model.to_string(), rpc),
            None => (last_segment.to_string(), ""),
        };
        if model.is_empty() {
            return Err(ApiError::invalid_request("Missing model path segment."));
        }
        let stream = rpc.contains("streamGenerateContent");

        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|_| ApiError::invalid_request("Invalid JSON body."))?;

        Ok(NativeRequest { model, stream, body })
    }
}
