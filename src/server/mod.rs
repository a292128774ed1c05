//! HTTP surface: one `axum::Router` per dialect family under `server::routes`,
//! composed into the final app in `server::router::build`.

pub mod extract;
pub mod pipeline;
pub mod router;
pub mod routes;
