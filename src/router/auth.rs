//! Bearer/`x-api-key` extraction, API key lookup, and the Discord-bind gate.

use axum::http::HeaderMap;

use crate::db::{ApiKey, Db, User};
use crate::error::ApiError;

pub struct AuthContext {
    pub user: User,
    pub api_key: ApiKey,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin() || self.api_key.is_admin()
    }
}

/// Pull the bearer token out of `Authorization: Bearer <token>` or the
/// `x-api-key` header, whichever is present (per `spec.md` §6: OpenAI/Gemini
/// callers use `Authorization`, Anthropic callers use `x-api-key`).
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION)
        && let Ok(value) = value.to_str()
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim());
        }
        return Some(value.trim());
    }
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

pub async fn authenticate(db: &Db, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let token = extract_token(headers).ok_or_else(|| ApiError::unauthorized("Missing API key."))?;

    let api_key = db
        .find_api_key_by_token(token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid API key."))?;
    if !api_key.active {
        return Err(ApiError::unauthorized("API key has been revoked."));
    }

    let user = db
        .find_user_by_id(api_key.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid API key."))?;
    if !user.active {
        return Err(ApiError::forbidden("User account is disabled."));
    }

    let settings = db.load_system_settings().await?;
    if settings.force_discord_bind && !api_key.is_admin() && user.linked_external_id.is_none() {
        return Err(ApiError::forbidden(
            "Account must be linked to Discord before use.",
        ));
    }

    Ok(AuthContext { user, api_key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sk-test"),
        );
        assert_eq!(extract_token(&headers), Some("sk-test"));
    }

    #[test]
    fn extracts_x_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("sk-anthropic"));
        assert_eq!(extract_token(&headers), Some("sk-anthropic"));
    }

    #[test]
    fn missing_headers_yield_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
