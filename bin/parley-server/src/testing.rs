//! Fakes shared by the route tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use parley_core::{
    ChatRelay, ClientError, CompletionClient, CompletionRequest, CompletionResponse,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::{API_KEY_VAR, Config};
use crate::routes;
use crate::state::AppState;

/// Completion client that always replies with the same text or error.
pub struct FixedClient {
    outcome: Result<String, String>,
    calls: Mutex<usize>,
}

impl FixedClient {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(text.to_owned()),
            calls: Mutex::new(0),
        })
    }

    pub fn failing(description: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(description.to_owned()),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionClient for FixedClient {
    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> Result<CompletionResponse, ClientError> {
        *self.calls.lock().unwrap() += 1;
        match &self.outcome {
            Ok(text) => Ok(CompletionResponse::from_reply(text.as_str())),
            Err(description) => Err(ClientError::Api {
                status: 429,
                message: description.clone(),
            }),
        }
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| (key == API_KEY_VAR).then(|| "sk-test".to_owned()))
        .expect("test config")
}

pub fn app_with(client: Arc<dyn CompletionClient>) -> (Router, Arc<AppState>) {
    let config = test_config();
    let relay = ChatRelay::new(client, config.relay());
    let state = Arc::new(AppState {
        config: Arc::new(config),
        relay: Arc::new(relay),
    });
    (routes::build(Arc::clone(&state)), state)
}

/// Send one request and decode the JSON body.
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
