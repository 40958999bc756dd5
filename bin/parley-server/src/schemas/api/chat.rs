//! Request / response bodies for `POST /api/chat`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message. Missing or empty is rejected with HTTP 400.
    #[serde(default)]
    pub message: Option<String>,
    /// Conversation to continue; omitted means the shared default session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response body for `POST /api/chat`.
///
/// A failed completion call still yields HTTP 200 with `response` set to
/// `"Error: <description>"`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
}

/// Body of every 4xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
