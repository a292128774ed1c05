//! Shared application state, the access-log middleware, and the top-level
//! router assembly (`build`). Adapted from the teacher's single-state,
//! single-key `PolluxState`/`pollux_router` pattern, generalized to a
//! multi-tenant, DB-backed auth model with one dialect-family sub-router
//! per `spec.md` §6.

use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderName, HeaderValue, Version};
use axum::middleware::{self, Next};
use axum::response::Response;
use base64::Engine as _;
use rand::RngCore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Db;
use crate::dispatch::{AntigravityClient, CloudCodeClient, Dispatcher};
use crate::oauth::{AntigravityOauthClient, GoogleOauthClient};
use crate::pool::{AntigravityPool, CloudCodePool};
use crate::quota::Governor;

use super::routes;

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub governor: Governor,
    pub dispatcher: Dispatcher,
    pub cloudcode_models: Vec<String>,
    pub antigravity_models: Vec<String>,
}

impl AppState {
    /// Builds the shared state from the resolved config and already-connected
    /// store/db/pool handles. One instance lives for the life of the process.
    pub fn new(
        config: &Config,
        db: Db,
        store: std::sync::Arc<dyn crate::cache::CoordinationStore>,
        http: reqwest::Client,
        google_oauth: GoogleOauthClient,
        antigravity_oauth: AntigravityOauthClient,
    ) -> Self {
        let cloudcode_cfg = config.cloudcode();
        let antigravity_cfg = config.antigravity();

        let cloudcode_pool = CloudCodePool::new(store.clone(), db.clone(), google_oauth);
        let antigravity_pool = AntigravityPool::new(store.clone(), db.clone(), antigravity_oauth);

        let cloudcode_client = CloudCodeClient::new(http.clone(), cloudcode_pool, cloudcode_cfg.api_url.clone());
        let antigravity_client = AntigravityClient::new(http, antigravity_pool, antigravity_cfg.api_url.clone());
        let dispatcher = Dispatcher::new(cloudcode_client, antigravity_client);

        let governor = Governor::new(store, db.clone(), config.quota.clone());

        Self {
            db,
            governor,
            dispatcher,
            cloudcode_models: cloudcode_cfg.model_list,
            antigravity_models: antigravity_cfg.model_list,
        }
    }
}

fn generate_request_id() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    // For SSE/streaming responses, `latency_ms` is time-to-first-byte, not
    // the full stream duration.
    let line = format!(
        "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
        status.as_u16(),
        request_id,
        method.as_str(),
        protocol,
        path,
        latency_ms,
        user_agent
    );
    if status.is_server_error() {
        error!("{line}");
    } else if status.is_client_error() {
        warn!("{line}");
    } else {
        info!("{line}");
    }

    resp
}

/// Assemble the full HTTP surface from `spec.md` §6: one sub-router per
/// dialect family, merged, with a `/health` liveness route left unguarded
/// and everything else behind the DB-backed auth extractor applied inside
/// each route's own extractor (`router::auth::authenticate`, via
/// `AuthContext`'s `FromRequestParts` impl in `server::extract`).
pub fn build(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::openai::router())
        .merge(routes::gemini::router())
        .merge(routes::anthropic::router())
        .merge(routes::googleai::router())
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
