use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use meridian_schema::antigravity::AntigravityRequestMeta;
use meridian_schema::gemini::GeminiResponseBody;
use meridian_schema::{CanonicalRequest, CanonicalResponse};
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::config::AGENT_SYSTEM_PREAMBLE;
use crate::dispatch::classify::{UpstreamOutcome, classify_upstream_status, parse_reset_hint};
use crate::dispatch::upstream::{canonical_to_gemini, gemini_response_to_canonical};
use crate::error::ApiError;
use crate::pool::AntigravityPool;

const LOCK_TTL_MS: u64 = 30_000;
const STREAM_LOCK_TTL_MS: u64 = 60_000;
const MAX_CREDENTIAL_ROTATIONS: usize = 3;

fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_factor(2.0)
        .with_max_times(3)
}

pub struct AntigravityClient {
    http: reqwest::Client,
    pool: AntigravityPool,
    api_url: Url,
}

impl AntigravityClient {
    pub fn new(http: reqwest::Client, pool: AntigravityPool, api_url: Url) -> Self {
        Self { http, pool, api_url }
    }

    fn build_envelope(&self, canonical: &CanonicalRequest, project: &str) -> serde_json::Value {
        let gemini_request = canonical_to_gemini(canonical);
        let meta = AntigravityRequestMeta {
            project: project.to_string(),
            request_id: format!("agent/{}/{}", chrono_millis(), Uuid::new_v4()),
            model: canonical.model.clone(),
        };
        let mut body = meta.into_request(gemini_request);
        if !AGENT_SYSTEM_PREAMBLE.is_empty() {
            body.prepend_system_instruction(AGENT_SYSTEM_PREAMBLE);
        }
        serde_json::to_value(body).expect("antigravity envelope always serializes")
    }

    pub async fn generate(
        &self,
        user: &str,
        canonical: &CanonicalRequest,
    ) -> Result<CanonicalResponse, ApiError> {
        for _ in 0..MAX_CREDENTIAL_ROTATIONS {
            let Some(credential) = self.pool.acquire(user, LOCK_TTL_MS).await? else {
                return Err(ApiError::no_available_credential());
            };
            let body = self.build_envelope(canonical, &credential.project_id);
            let url = format!("{}/v1internal:generateContent", self.api_url.as_str().trim_end_matches('/'));

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
                    async move { http.post(&url).bearer_auth(token).json(&body).send().await }
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
                    warn!(credential_id = credential.credential_id, "antigravity 403");
                    self.pool.record_permanent_denial(credential.credential_id).await?;
                    self.pool.release(credential.credential_id, user).await?;
                    continue;
                }
                UpstreamOutcome::Transient => {
                    self.pool.release(credential.credential_id, user).await?;
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::upstream(format!("antigravity upstream error {status}: {body}")));
                }
            }
        }

        Err(ApiError::no_available_credential())
    }

    pub async fn open_stream(
        &self,
        user: &str,
        canonical: &CanonicalRequest,
    ) -> Result<(i64, reqwest::Response), ApiError> {
        for _ in 0..MAX_CREDENTIAL_ROTATIONS {
            let Some(credential) = self.pool.acquire(user, STREAM_LOCK_TTL_MS).await? else {
                return Err(ApiError::no_available_credential());
            };
            let body = self.build_envelope(canonical, &credential.project_id);
            let url = format!(
                "{}/v1internal:streamGenerateContent?alt=sse",
                self.api_url.as_str().trim_end_matches('/')
            );

            let response = self
                .http
                .post(&url)
                .bearer_auth(&credential.access_token)
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
                    return Err(ApiError::upstream(format!("antigravity upstream error {status}: {body}")));
                }
            }
        }

        Err(ApiError::no_available_credential())
    }

    pub async fn release(&self, credential_id: i64, user: &str) -> Result<(), ApiError> {
        self.pool.release(credential_id, user).await
    }
}

fn chrono_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
