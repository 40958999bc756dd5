//! Routes nested under `/api`.

pub mod chat;
pub mod session;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().merge(chat::router()).merge(session::router())
}

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = chat::ChatApi::openapi();
    spec.merge(session::SessionApi::openapi());
    spec
}
