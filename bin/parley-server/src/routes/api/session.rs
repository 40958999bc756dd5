use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::api::chat::ErrorResponse;
use crate::schemas::api::session::{RemoveResponse, MessageResponse, SessionListResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_sessions, session_history, delete_session),
    components(schemas(SessionListResponse, MessageResponse, RemoveResponse))
)]
pub struct SessionApi;

/// Register session routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/history", get(session_history))
}

// ── Session handlers ──────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Known session ids", body = SessionListResponse),
    )
)]
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.relay.sessions(),
    })
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/history",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id; \"default\" for unscoped chats")),
    responses(
        (status = 200, description = "Retained turns, oldest first", body = Vec<MessageResponse>),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let history = state
        .relay
        .history(&id)
        .ok_or_else(|| ServerError::NotFound(format!("session {id}")))?;
    Ok(Json(history.into_iter().map(MessageResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted; \"default\" is only cleared", body = RemoveResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, ServerError> {
    if !state.relay.remove(&id) {
        return Err(ServerError::NotFound(format!("session {id}")));
    }
    Ok(Json(RemoveResponse { removed: true }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{FixedClient, app_with, get, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn history_lists_turns_in_order() {
        let (app, state) = app_with(FixedClient::replying("Hello there!"));
        state.relay.respond("Hi").await.unwrap();

        let (status, body) = send(app, get("/api/sessions/default/history")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hello there!" }
            ])
        );
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (app, _) = app_with(FixedClient::replying("ok"));
        let (status, body) = send(app, get("/api/sessions/nope/history")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "session nope" }));
    }

    #[tokio::test]
    async fn sessions_are_listed() {
        let (app, state) = app_with(FixedClient::replying("ok"));
        state.relay.respond_in("b", "x").await.unwrap();
        state.relay.respond_in("a", "y").await.unwrap();

        let (_, body) = send(app, get("/api/sessions")).await;
        assert_eq!(body, json!({ "sessions": ["a", "b", "default"] }));
    }

    #[tokio::test]
    async fn default_history_is_empty_before_first_chat() {
        let (app, _) = app_with(FixedClient::replying("ok"));
        let (status, body) = send(app, get("/api/sessions/default/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    fn delete_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn delete_removes_named_session() {
        let (app, state) = app_with(FixedClient::replying("ok"));
        state.relay.respond_in("tab-1", "Hi").await.unwrap();

        let (status, body) = send(app.clone(), delete_req("/api/sessions/tab-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "removed": true }));

        let (status, _) = send(app.clone(), get("/api/sessions/tab-1/history")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = send(app.clone(), get("/api/sessions")).await;
        assert_eq!(body, json!({ "sessions": ["default"] }));

        let (status, _) = send(app, delete_req("/api/sessions/tab-1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_clears_default_session() {
        let (app, state) = app_with(FixedClient::replying("ok"));
        state.relay.respond("Hi").await.unwrap();

        let (status, body) = send(app, delete_req("/api/sessions/default")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "removed": true }));
        assert_eq!(state.relay.history("default"), Some(Vec::new()));
    }
}
