//! Wires `router::auth::authenticate` in as an axum extractor so every
//! guarded handler can take `AuthContext` as a parameter instead of pulling
//! headers out by hand.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::router::auth::{self, AuthContext};

use super::router::AppState;

pub struct Auth(pub AuthContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        auth::authenticate(&state.db, &parts.headers).await.map(Auth)
    }
}
