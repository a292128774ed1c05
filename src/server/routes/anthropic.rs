//! Anthropic-dialect surface (`spec.md` §6): `/v1/messages`, Anthropic's
//! native wire shape end to end.

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::dialect::Dialect;
use crate::server::extract::Auth;
use crate::server::pipeline;
use crate::server::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/messages", post(messages))
}

async fn messages(State(state): State<AppState>, Auth(ctx): Auth, Json(body): Json<Value>) -> Response {
    match pipeline::handle(&state, &ctx, Dialect::Anthropic, body, None, None).await {
        Ok(response) => response,
        Err(err) => err.render(Dialect::Anthropic),
    }
}
