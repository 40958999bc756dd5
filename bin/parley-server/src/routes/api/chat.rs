//! Chat relay route.
//!
//! `POST /api/chat` forwards one user message to the completion API together
//! with the recent turns of its session and returns the reply.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use parley_core::DEFAULT_SESSION;
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::api::chat::{ChatRequest, ChatResponse, ErrorResponse};
use crate::state::AppState;

pub const NO_MESSAGE: &str = "No message provided";
/// Longest accepted `session_id`, in bytes after trimming.
pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, ChatResponse, ErrorResponse))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Relay one chat turn (`POST /api/chat`).
///
/// A completion failure is not an HTTP error: the reply is reported as
/// `"Error: <description>"` with status 200.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply, or an \"Error: ...\" string", body = ChatResponse),
        (status = 400, description = "No message provided, or session_id too long", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(req) = payload?;

    let message = req
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ServerError::BadRequest(NO_MESSAGE.into()))?;

    let session = req
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION);
    if session.len() > MAX_SESSION_ID_LEN {
        return Err(ServerError::BadRequest(format!(
            "session_id exceeds {MAX_SESSION_ID_LEN} bytes"
        )));
    }

    debug!(session, input_len = message.len(), "chat request");

    let response = match state.relay.respond_in(session, &message).await {
        Ok(reply) => reply,
        Err(e) => format!("Error: {e}"),
    };

    Ok(Json(ChatResponse { response }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{FixedClient, app_with, post_json, send};
    use axum::http::StatusCode;
    use parley_core::{Message, Role};
    use serde_json::json;

    #[tokio::test]
    async fn reply_is_returned_and_recorded() {
        let client = FixedClient::replying("Hello there!");
        let (app, state) = app_with(client.clone());

        let (status, body) = send(app, post_json("/api/chat", r#"{"message":"Hi"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "response": "Hello there!" }));
        let history = state.relay.history(DEFAULT_SESSION).unwrap();
        assert_eq!(
            history[history.len() - 2..].to_vec(),
            vec![Message::user("Hi"), Message::assistant("Hello there!")]
        );
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn remote_failure_is_embedded_in_ok_response() {
        let (app, state) = app_with(FixedClient::failing("rate limited"));

        let (status, body) = send(app, post_json("/api/chat", r#"{"message":"Hi"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "response": "Error: rate limited" }));
        let history = state.relay.history(DEFAULT_SESSION).unwrap();
        assert_eq!(history, vec![Message::user("Hi")]);
    }

    #[tokio::test]
    async fn missing_or_empty_message_is_rejected() {
        for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":null}"#] {
            let client = FixedClient::replying("unused");
            let (app, state) = app_with(client.clone());

            let (status, resp) = send(app, post_json("/api/chat", body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(resp, json!({ "error": "No message provided" }));
            assert_eq!(client.calls(), 0);
            assert_eq!(state.relay.history(DEFAULT_SESSION), Some(Vec::new()));
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let client = FixedClient::replying("unused");
        let (app, _) = app_with(client.clone());

        let (status, body) = send(app, post_json("/api/chat", "{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn session_id_scopes_history() {
        let (app, state) = app_with(FixedClient::replying("ok"));

        let (status, _) = send(
            app,
            post_json("/api/chat", r#"{"message":"Hi","session_id":"tab-1"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let roles: Vec<Role> = state
            .relay
            .history("tab-1")
            .unwrap()
            .into_iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        assert_eq!(state.relay.history(DEFAULT_SESSION), Some(Vec::new()));
    }

    #[tokio::test]
    async fn overlong_session_id_is_rejected() {
        let client = FixedClient::replying("unused");
        let (app, state) = app_with(client.clone());
        let id = "x".repeat(MAX_SESSION_ID_LEN + 1);
        let body = json!({ "message": "Hi", "session_id": id }).to_string();

        let (status, resp) = send(app.clone(), post_json("/api/chat", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({ "error": "session_id exceeds 128 bytes" }));
        assert_eq!(client.calls(), 0);
        assert_eq!(state.relay.sessions(), [DEFAULT_SESSION]);

        let id = "x".repeat(MAX_SESSION_ID_LEN);
        let body = json!({ "message": "Hi", "session_id": id }).to_string();
        let (status, _) = send(app, post_json("/api/chat", &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn blank_session_id_uses_default() {
        let (app, state) = app_with(FixedClient::replying("ok"));

        send(app, post_json("/api/chat", r#"{"message":"Hi","session_id":"  "}"#)).await;

        assert_eq!(state.relay.history(DEFAULT_SESSION).unwrap().len(), 2);
    }
}
