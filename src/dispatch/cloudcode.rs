use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use meridian_schema::gemini::GeminiResponseBody;
use meridian_schema::{CanonicalChunk, CanonicalRequest, CanonicalResponse};
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::dispatch::classify::{UpstreamOutcome, classify_upstream_status, parse_reset_hint};
use crate::dispatch::upstream::{canonical_to_gemini, gemini_response_to_canonical, gemini_response_to_chunk};
use crate::error::ApiError;
use crate::pool::{CloudCodePool, PoolKind};

const LOCK_TTL_MS: u64 = 30_000;
const STREAM_LOCK_TTL_MS: u64 = 60_000;
const MAX_CREDENTIAL_ROTATIONS: usize = 3;
const USER_AGENT: &str = "google-api-nodejs-client/9.15.1";

fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_factor(2.0)
        .with_max_times(3)
}

pub struct CloudCodeClient {
    http: reqwest::Client,
    pool: CloudCodePool,
    api_url: Url,
}

impl CloudCodeClient {
    pub fn new(http: reqwest::Client, pool: CloudCodePool, api_url: Url) -> Self {
        Self { http, pool, api_url }
    }

    /// Non-stream `generateContent` call, rotating credentials on
    /// rate-limit/permanent-denial, retrying transient failures in place.
    pub async fn generate(
        &self,
        user: &str,
        pool_kind: PoolKind,
        canonical: &CanonicalRequest,
        project_override: Option<&str>,
    ) -> Result<CanonicalResponse, ApiError> {
        let gemini_request = canonical_to_gemini(canonical);

        for _ in 0..MAX_CREDENTIAL_ROTATIONS {
            let Some(credential) = self.pool.acquire(pool_kind, user, LOCK_TTL_MS).await? else {
                return Err(ApiError::no_available_credential());
            };
            let project = project_override.unwrap_or(&credential.project_id);
            let url = format!("{}/v1internal:generateContent", self.api_url.as_str().trim_end_matches('/'));
            let body = serde_json::json!({
                "model": canonical.model,
                "project": project,
                "user_prompt_id": Uuid::new_v4().to_string(),
                "request": &gemini_request,
            });

            let attempt = {
                let http = self.http.clone();
                let url = url.clone();
                let token = credential.access_token.clone();
                let body = body.clone();
                move || {
                    let http = http.clone();
                    let url = url.clone();
                    let token = token.clone();
                    let body = body.clone();
                    async move {
                        http.post(&url)
                            .bearer_auth(token)
                            .header(reqwest::header::USER_AGENT, USER_AGENT)
                            .json(&body)
                            .send()
                            .await
                    }
                }
            };

            let response = attempt
                .retry(retry_policy())
                .when(|e: &reqwest::Error| !e.is_status() || e.status().is_some_and(|s| s.is_server_error()))
                .await?;

            let status = response.status();
            match classify_upstream_status(status) {
                UpstreamOutcome::Success => {
                    let parsed: GeminiResponseBody = response.json().await?;
                    let canonical_response = gemini_response_to_canonical(canonical.model.clone(), parsed);
                    self.pool.release(credential.credential_id, user).await?;
                    return Ok(canonical_response);
                }
                UpstreamOutcome::RateLimited => {
                    let reset_hint = parse_reset_hint(response.headers());
                    self.pool.mark_cooling(credential.credential_id, reset_hint).await?;
                    self.pool.release(credential.credential_id, user).await?;
                    continue;
                }
                UpstreamOutcome::PermanentDenial => {
                    warn!(credential_id = credential.credential_id, "cloud code 403");
                    self.pool.record_permanent_denial(credential.credential_id).await?;
                    self.pool.release(credential.credential_id, user).await?;
                    continue;
                }
                UpstreamOutcome::Transient => {
                    self.pool.release(credential.credential_id, user).await?;
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::upstream(format!("cloud code upstream error {status}: {body}")));
                }
            }
        }

        Err(ApiError::no_available_credential())
    }

    /// Opens the upstream `streamGenerateContent` call and returns the raw
    /// byte stream plus the credential lease; `stream_pump::pump` drives
    /// translation and client-facing framing from there.
    pub async fn open_stream(
        &self,
        user: &str,
        pool_kind: PoolKind,
        canonical: &CanonicalRequest,
        project_override: Option<&str>,
    ) -> Result<(i64, reqwest::Response), ApiError> {
        let gemini_request = canonical_to_gemini(canonical);

        for _ in 0..MAX_CREDENTIAL_ROTATIONS {
            let Some(credential) = self.pool.acquire(pool_kind, user, STREAM_LOCK_TTL_MS).await? else {
                return Err(ApiError::no_available_credential());
            };
            let project = project_override.unwrap_or(&credential.project_id);
            let url = format!(
                "{}/v1internal:streamGenerateContent?alt=sse",
                self.api_url.as_str().trim_end_matches('/')
            );
            let body = serde_json::json!({
                "model": canonical.model,
                "project": project,
                "user_prompt_id": Uuid::new_v4().to_string(),
                "request": &gemini_request,
            });

            let response = self
                .http
                .post(&url)
                .bearer_auth(&credential.access_token)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .json(&body)
                .send()
                .await?;

            match classify_upstream_status(response.status()) {
                UpstreamOutcome::Success => return Ok((credential.credential_id, response)),
                UpstreamOutcome::RateLimited => {
                    let reset_hint = parse_reset_hint(response.headers());
                    self.pool.mark_cooling(credential.credential_id, reset_hint).await?;
                    self.pool.release(credential.credential_id, user).await?;
                    continue;
                }
                UpstreamOutcome::PermanentDenial => {
                    self.pool.record_permanent_denial(credential.credential_id).await?;
                    self.pool.release(credential.credential_id, user).await?;
                    continue;
                }
                UpstreamOutcome::Transient => {
                    self.pool.release(credential.credential_id, user).await?;
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::upstream(format!("cloud code upstream error {status}: {body}")));
                }
            }
        }

        Err(ApiError::no_available_credential())
    }

    pub async fn release(&self, credential_id: i64, user: &str) -> Result<(), ApiError> {
        self.pool.release(credential_id, user).await
    }
}

/// Parse one line of the upstream's newline-delimited (or SSE `data:`
/// framed) JSON stream into a canonical chunk.
pub fn parse_stream_line(line: &str) -> Result<Option<CanonicalChunk>, ApiError> {
    let line = line.strip_prefix("data:").map(str::trim).unwrap_or(line.trim());
    if line.is_empty() || line == "[DONE]" {
        return Ok(None);
    }
    let body: GeminiResponseBody = serde_json::from_str(line)?;
    Ok(Some(gemini_response_to_chunk(body)))
}
