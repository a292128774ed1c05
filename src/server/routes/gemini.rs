//! Gemini-native surface (`spec.md` §6): `models/{model}:{generate,stream}
//! GenerateContent` wildcard routes plus the Gemini-shaped model listing
//! alias, both taking the model from the URL path rather than the body.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use meridian_schema::gemini::GeminiModelList;

use crate::dialect::Dialect;
use crate::error::ApiError;
use crate::server::extract::Auth;
use crate::server::pipeline;
use crate::server::router::AppState;
use crate::server::routes::NativeRequest;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/models/{*path}", post(generate_content))
        .route("/v1beta/models", get(list_models))
}

async fn generate_content(State(state): State<AppState>, Auth(ctx): Auth, native: NativeRequest) -> Response {
    match pipeline::handle(
        &state,
        &ctx,
        Dialect::Gemini,
        native.body,
        Some(native.model),
        Some(native.stream),
    )
    .await
    {
        Ok(response) => response,
        Err(err) => err.render(Dialect::Gemini),
    }
}

async fn list_models(State(state): State<AppState>, Auth(_ctx): Auth) -> Result<Response, ApiError> {
    let mut names = state.cloudcode_models.clone();
    names.extend(state.antigravity_models.clone());
    let list = GeminiModelList::from_model_names(names);
    Ok(Json(list).into_response())
}
