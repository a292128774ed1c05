//! Shared request pipeline from `spec.md` §2's data-flow diagram:
//! canonicalize → normalize → access-check → quota-check → dispatch →
//! format. Authentication happens earlier, via the `Auth` extractor.

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use uuid::Uuid;

use crate::dialect::{self, Dialect};
use crate::dispatch::{self, stream_pump};
use crate::error::ApiError;
use crate::router::auth::AuthContext;
use crate::router::{access, dispatch_decision, model_norm};

use super::router::AppState;

/// Header-assisted dialect hint layered on top of `dialect::detect`'s
/// body-shape heuristic, for the one endpoint (`/v1/chat/completions`) that
/// serves all three dialects behind a single path (`spec.md` §6).
pub fn detect_dialect(headers: &HeaderMap, body: &Value) -> Dialect {
    if headers.contains_key("anthropic-version") && headers.contains_key("x-api-key") {
        return Dialect::Anthropic;
    }
    if headers.contains_key("x-goog-api-key") {
        return Dialect::Gemini;
    }
    let user_agent_is_gemini = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.to_ascii_lowercase().contains("gemini"));
    if user_agent_is_gemini {
        return Dialect::Gemini;
    }
    dialect::detect(body)
}

fn response_id(dialect: Dialect) -> String {
    match dialect {
        Dialect::Anthropic => format!("msg_{}", Uuid::new_v4().simple()),
        Dialect::OpenAi | Dialect::Gemini => format!("chatcmpl-{}", Uuid::new_v4().simple()),
    }
}

/// Runs the full pipeline and returns the final HTTP response. `model_override`
/// is set by the Gemini/Cloud-Code-native routes, where the model comes from
/// the URL path segment rather than the request body; `force_stream` is set
/// by the `streamGenerateContent` native routes, where streaming is decided
/// by the RPC suffix rather than a `stream` field in the body. `family_override`
/// is set by the `/googleai/*` routes: that surface is Cloud Code's own native
/// endpoint, so it must always dispatch to Cloud Code even for a model name
/// that also appears on the Antigravity model list.
pub async fn handle(
    state: &AppState,
    ctx: &AuthContext,
    dialect: Dialect,
    body: Value,
    model_override: Option<String>,
    force_stream: Option<bool>,
) -> Result<Response, ApiError> {
    handle_inner(state, ctx, dialect, body, model_override, force_stream, None).await
}

/// Like `handle`, but lets the caller pin the dispatch family instead of
/// deriving it from the model name via `dispatch_decision::route`.
pub async fn handle_with_family(
    state: &AppState,
    ctx: &AuthContext,
    dialect: Dialect,
    body: Value,
    model_override: Option<String>,
    force_stream: Option<bool>,
    family_override: dispatch::Family,
) -> Result<Response, ApiError> {
    handle_inner(state, ctx, dialect, body, model_override, force_stream, Some(family_override)).await
}

async fn handle_inner(
    state: &AppState,
    ctx: &AuthContext,
    dialect: Dialect,
    body: Value,
    model_override: Option<String>,
    force_stream: Option<bool>,
    family_override: Option<dispatch::Family>,
) -> Result<Response, ApiError> {
    let mut canonical = dialect::to_canonical(dialect, body)?;
    if let Some(model) = model_override {
        canonical.model = model;
    }
    if let Some(stream) = force_stream {
        canonical.stream = stream;
    }
    if canonical.model.trim().is_empty() {
        return Err(ApiError::invalid_request("Request is missing a model name."));
    }

    let normalized = model_norm::normalize(&canonical.model);
    canonical.model = normalized.model;

    let settings = state.db.load_system_settings().await?;
    let tier = state.governor.derive_tier(ctx.user.id).await?;

    if canonical.model.starts_with("gemini-3") {
        access::check_v3(&state.db, ctx, &settings).await?;
    }
    access::check_cli_shared(&state.db, &ctx.user, &settings).await?;

    if !state.governor.check_and_reserve_rate_slot(&ctx.user, tier).await? {
        return Err(ApiError::rate_limited("Rate limit exceeded for your tier."));
    }
    if !state.governor.has_daily_quota(&ctx.user, tier).await? {
        return Err(ApiError::quota_exceeded("Daily quota exhausted."));
    }

    let family = family_override.unwrap_or_else(|| dispatch_decision::route(&canonical.model, &state.antigravity_models));
    let is_antigravity = matches!(family, dispatch::Family::Antigravity);

    if is_antigravity && !ctx.user.is_admin() {
        let is_claude_model = canonical.model.to_ascii_lowercase().contains("claude");
        let used = state.governor.antigravity_used(ctx.user.id, &canonical.model).await?;
        let remaining = state
            .governor
            .antigravity_quota_remaining(&ctx.user, is_claude_model, used)
            .await?;
        if remaining <= 0 {
            return Err(ApiError::quota_exceeded("Antigravity quota exhausted for this model."));
        }
    }

    let user_key = ctx.user.id.to_string();

    if canonical.stream && !normalized.fake_stream {
        let id = response_id(dialect);
        let created = chrono::Utc::now().timestamp();
        let model = canonical.model.clone();
        if is_antigravity {
            state.governor.record_antigravity_usage(ctx.user.id, &model, 0).await?;
        } else {
            state.governor.record_usage(ctx.user.id, &model).await?;
        }
        let response = state
            .dispatcher
            .stream(family, user_key, dialect, id, model, created, &canonical, None)
            .await;
        return Ok(response);
    }

    let response = state.dispatcher.generate(family, &user_key, &canonical, None).await?;

    if is_antigravity {
        state
            .governor
            .record_antigravity_usage(
                ctx.user.id,
                &canonical.model,
                i64::from(response.usage.completion_tokens),
            )
            .await?;
    } else {
        state.governor.record_usage(ctx.user.id, &canonical.model).await?;
    }

    if normalized.fake_stream {
        let id = response_id(dialect);
        let created = chrono::Utc::now().timestamp();
        return Ok(stream_pump::synthetic(dialect, id, canonical.model, created, response));
    }

    let id = response_id(dialect);
    let created = chrono::Utc::now().timestamp();
    let body = dialect::from_canonical(dialect, id, created, response);
    Ok((StatusCode::OK, Json(body)).into_response())
}
