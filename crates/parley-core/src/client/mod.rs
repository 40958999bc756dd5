//! Remote completion API boundary.
//!
//! [`CompletionClient`] is the only seam between the relay and the language
//! model service. [`openai::OpenAiClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint; tests substitute in-memory fakes.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Body of a chat-completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// The subset of a chat-completion result the relay consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// `null` when the model produced no text (e.g. a tool call).
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// A single-choice response carrying `text`.
    pub fn from_reply(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(text.into()),
                },
            }],
        }
    }

    /// Text of the first choice.
    pub fn into_reply(self) -> Result<String, ClientError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(ClientError::EmptyResponse)
    }
}

/// Failures raised while contacting the completion API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: DNS, connect, TLS, timeout.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body was not a chat-completion object.
    #[error("invalid completion response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response held no choices or an empty message.
    #[error("completion response contained no message content")]
    EmptyResponse,
}

#[async_trait]
pub trait CompletionClient: Send + Sync + 'static {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ClientError>;
}
