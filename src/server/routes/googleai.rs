//! Cloud Code native surface (`spec.md` §6): `/googleai/models/...`. This
//! path is Cloud Code's own endpoint, so requests always dispatch to Cloud
//! Code even if the model name happens to also be Antigravity-tagged, and
//! the listing only ever shows Cloud Code's model list.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use meridian_schema::gemini::GeminiModelList;

use crate::dialect::Dialect;
use crate::dispatch::Family;
use crate::error::ApiError;
use crate::pool::PoolKind;
use crate::server::extract::Auth;
use crate::server::pipeline;
use crate::server::router::AppState;
use crate::server::routes::NativeRequest;

const V3_MODEL_PREFIX: &str = "gemini-3";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/googleai/models", get(list_models))
        .route("/googleai/models/{*path}", post(generate_content))
}

async fn generate_content(State(state): State<AppState>, Auth(ctx): Auth, native: NativeRequest) -> Response {
    let pool_kind = if native.model.starts_with(V3_MODEL_PREFIX) {
        PoolKind::V3
    } else {
        PoolKind::General
    };
    match pipeline::handle_with_family(
        &state,
        &ctx,
        Dialect::Gemini,
        native.body,
        Some(native.model),
        Some(native.stream),
        Family::CloudCode(pool_kind),
    )
    .await
    {
        Ok(response) => response,
        Err(err) => err.render(Dialect::Gemini),
    }
}

async fn list_models(State(state): State<AppState>, Auth(_ctx): Auth) -> Result<Response, ApiError> {
    let list = GeminiModelList::from_model_names(state.cloudcode_models.clone());
    Ok(Json(list).into_response())
}
