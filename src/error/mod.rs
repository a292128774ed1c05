mod oauth;

pub use oauth::OauthError;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;

use crate::dialect::Dialect;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Coarse error taxonomy shared across dialects, per the gateway's unified
/// error contract: every failure collapses into one of these kinds before
/// it is rendered in the caller's dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    QuotaExceeded,
    NoAvailableCredential,
    UpstreamError,
    BadUpstreamPayload,
    Internal,
}

impl ApiErrorKind {
    fn http_status(self) -> StatusCode {
        match self {
            ApiErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorKind::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            ApiErrorKind::NoAvailableCredential => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorKind::UpstreamError | ApiErrorKind::BadUpstreamPayload => {
                StatusCode::BAD_GATEWAY
            }
            ApiErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code_str(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Forbidden => "forbidden",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::RateLimited => "rate_limited",
            ApiErrorKind::QuotaExceeded => "quota_exceeded",
            ApiErrorKind::NoAvailableCredential => "no_available_credential",
            ApiErrorKind::UpstreamError => "upstream_error",
            ApiErrorKind::BadUpstreamPayload => "bad_upstream_payload",
            ApiErrorKind::Internal => "internal_error",
        }
    }
}

/// Unified gateway error: `{kind, http_status, message, retryable}`.
///
/// Upstream-specific error bodies (`OauthError`, upstream JSON error
/// objects) convert into this via `From` impls; dialect adapters render it
/// in the caller's wire format with `ApiError::render`.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        let retryable = matches!(
            kind,
            ApiErrorKind::RateLimited | ApiErrorKind::UpstreamError
        );
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::QuotaExceeded, message)
    }

    pub fn no_available_credential() -> Self {
        Self::new(
            ApiErrorKind::NoAvailableCredential,
            "No available credentials to process the request.",
        )
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::UpstreamError, message)
    }

    pub fn bad_upstream_payload(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadUpstreamPayload, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    pub fn http_status(&self) -> StatusCode {
        self.kind.http_status()
    }

    /// Render this error in the caller's detected dialect.
    pub fn render(&self, dialect: Dialect) -> axum::response::Response {
        let status = self.http_status();
        let body: Value = match dialect {
            Dialect::OpenAi => json!({
                "error": {
                    "message": self.message,
                    "type": self.kind.code_str(),
                    "code": status.as_u16(),
                }
            }),
            Dialect::Anthropic => json!({
                "type": "error",
                "error": {
                    "type": self.kind.code_str(),
                    "message": self.message,
                }
            }),
            Dialect::Gemini => json!({
                "error": {
                    "code": status.as_u16(),
                    "message": self.message,
                    "status": self.kind.code_str().to_uppercase(),
                }
            }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<OauthError> for ApiError {
    fn from(err: OauthError) -> Self {
        match err {
            OauthError::Flow { message, .. } => ApiError::forbidden(message),
            OauthError::UpstreamStatus(status) if status == StatusCode::TOO_MANY_REQUESTS => {
                ApiError::rate_limited("Upstream OAuth rate limit exceeded.")
            }
            OauthError::UpstreamStatus(_) => ApiError::upstream("Upstream OAuth error."),
            OauthError::Request(_) => ApiError::upstream("OAuth transport error."),
            OauthError::ServerResponse { error } => {
                ApiError::new(ApiErrorKind::Unauthorized, error).retryable(false)
            }
            OauthError::Parse { .. } => ApiError::bad_upstream_payload("Malformed OAuth response."),
            OauthError::Other { message } => ApiError::internal(message),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::upstream(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_upstream_payload(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(err: redis::RedisError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl IsRetryable for ApiError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Fallback rendering used for errors raised before a dialect is known
/// (e.g. auth middleware, body-parsing rejections) — OpenAI shape, since
/// that is the gateway's default/most common caller.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.render(Dialect::OpenAi)
    }
}

/// Standardized API error response payload, used by the few endpoints
/// (health, admin-adjacent) that are dialect-agnostic.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
