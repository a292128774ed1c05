//! Liveness probe (`spec.md` §6). Deliberately unauthenticated and outside
//! the access-log's usual request volume concerns — load balancers poll it.

use axum::Router;
use axum::routing::get;

use crate::server::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
