//! Upstream Dispatcher: translates a canonical request into the Cloud Code
//! or Antigravity wire shape, leases a credential from the matching pool,
//! sends it, classifies the result, and (for streaming calls) pumps the
//! upstream byte stream back out through the caller's dialect.

mod antigravity;
mod classify;
mod cloudcode;
pub(crate) mod stream_pump;
mod upstream;

pub use antigravity::AntigravityClient;
pub use classify::{UpstreamOutcome, classify_upstream_status, parse_reset_hint};
pub use cloudcode::CloudCodeClient;

use std::sync::Arc;

use axum::response::Response;
use meridian_schema::CanonicalRequest;

use crate::dialect::Dialect;
use crate::error::ApiError;
use crate::pool::PoolKind;

/// Which upstream family a request is routed to, decided by
/// `router::dispatch_decision` from the requested model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    CloudCode(PoolKind),
    Antigravity,
}

#[derive(Clone)]
pub struct Dispatcher {
    cloudcode: Arc<CloudCodeClient>,
    antigravity: Arc<AntigravityClient>,
}

impl Dispatcher {
    pub fn new(cloudcode: CloudCodeClient, antigravity: AntigravityClient) -> Self {
        Self {
            cloudcode: Arc::new(cloudcode),
            antigravity: Arc::new(antigravity),
        }
    }

    pub async fn generate(
        &self,
        family: Family,
        user: &str,
        canonical: &CanonicalRequest,
        project_override: Option<&str>,
    ) -> Result<meridian_schema::CanonicalResponse, ApiError> {
        match family {
            Family::CloudCode(pool_kind) => {
                self.cloudcode.generate(user, pool_kind, canonical, project_override).await
            }
            Family::Antigravity => self.antigravity.generate(user, canonical).await,
        }
    }

    /// Opens the upstream stream and pumps it into a client-facing SSE/NDJSON
    /// response framed in `dialect`, releasing the credential lock when the
    /// stream ends or the client disconnects.
    pub async fn stream(
        &self,
        family: Family,
        user: String,
        dialect: Dialect,
        response_id: String,
        model: String,
        created: i64,
        canonical: &CanonicalRequest,
        project_override: Option<&str>,
    ) -> Response {
        let opened = match family {
            Family::CloudCode(pool_kind) => {
                self.cloudcode
                    .open_stream(&user, pool_kind, canonical, project_override)
                    .await
            }
            Family::Antigravity => self.antigravity.open_stream(&user, canonical).await,
        };

        let (credential_id, upstream_response) = match opened {
            Ok(pair) => pair,
            Err(err) => return stream_pump::error_response(dialect, &err),
        };

        match family {
            Family::CloudCode(_) => {
                let cloudcode = Arc::clone(&self.cloudcode);
                stream_pump::pump(dialect, response_id, model, created, upstream_response, move || async move {
                    let _ = cloudcode.release(credential_id, &user).await;
                })
                .await
            }
            Family::Antigravity => {
                let antigravity = Arc::clone(&self.antigravity);
                stream_pump::pump(dialect, response_id, model, created, upstream_response, move || async move {
                    let _ = antigravity.release(credential_id, &user).await;
                })
                .await
            }
        }
    }
}
