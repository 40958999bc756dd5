pub mod client;
pub mod history;
pub mod message;
pub mod relay;

pub use client::{ClientError, CompletionClient, CompletionRequest, CompletionResponse};
pub use client::{OpenAiClient, OpenAiConfig};
pub use history::HistoryBuffer;
pub use message::{Message, Role};
pub use relay::{ChatRelay, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION, RelayConfig, RelayError};
