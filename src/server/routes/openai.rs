//! OpenAI-dialect surface (`spec.md` §6): the generic chat-completions
//! endpoint serves all three dialects via header/body sniffing, while
//! `/v1/models` always answers in OpenAI's listing shape unless asked
//! otherwise.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use meridian_schema::gemini::GeminiModelList;
use meridian_schema::openai::OpenaiModelList;

use crate::error::ApiError;
use crate::server::extract::Auth;
use crate::server::pipeline;
use crate::server::router::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
}

async fn chat_completions(
    State(state): State<AppState>,
    Auth(ctx): Auth,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let dialect = pipeline::detect_dialect(&headers, &body);
    match pipeline::handle(&state, &ctx, dialect, body, None, None).await {
        Ok(response) => response,
        Err(err) => err.render(dialect),
    }
}

#[derive(Deserialize)]
struct ListModelsQuery {
    format: Option<String>,
}

async fn list_models(
    State(state): State<AppState>,
    Auth(_ctx): Auth,
    axum::extract::Query(query): axum::extract::Query<ListModelsQuery>,
) -> Result<Response, ApiError> {
    let mut names = state.cloudcode_models.clone();
    names.extend(state.antigravity_models.clone());

    if query.format.as_deref() == Some("gemini") {
        let list = GeminiModelList::from_model_names(names);
        return Ok(Json(list).into_response());
    }
    let list = OpenaiModelList::from_model_names(names, "meridian".to_string());
    Ok(Json(list).into_response())
}
