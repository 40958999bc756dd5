//! Chat relay: one user turn in, one assistant turn out.
//!
//! Each turn appends the user message to the session's [`HistoryBuffer`],
//! sends the whole buffer to the [`CompletionClient`], and on success appends
//! the reply. A failed call leaves the user turn in place and appends nothing.
//!
//! Requests that do not name a session share [`DEFAULT_SESSION`], which
//! exists from construction and is never evicted. Named sessions live in an
//! LRU map of at most `max_sessions` entries; the least recently used one is
//! dropped when a new name would exceed it.
//!
//! A session has two locks. The turn lock is held across the remote call so
//! two turns on the same session never interleave their appends. The history
//! lock is only held while the buffer is read or written, so listing or
//! clearing a session never waits on a slow completion.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ClientError, CompletionClient, CompletionRequest, CompletionResponse};
use crate::history::{DEFAULT_CAPACITY, HistoryBuffer};
use crate::message::{Message, Role};

pub const DEFAULT_SESSION: &str = "default";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
/// Named sessions kept before the least recently used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Per-turn request settings shared by every session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub model: String,
    pub max_tokens: u32,
    pub history_capacity: usize,
    /// Sent ahead of the history on every call; not stored.
    pub system_prompt: Option<String>,
    /// Upper bound on named sessions. `0` is treated as `1`.
    pub max_sessions: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            history_capacity: DEFAULT_CAPACITY,
            system_prompt: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Remote(#[from] ClientError),
}

struct Session {
    turn: tokio::sync::Mutex<()>,
    history: Mutex<HistoryBuffer>,
}

impl Session {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            turn: tokio::sync::Mutex::new(()),
            history: Mutex::new(HistoryBuffer::new(capacity)),
        })
    }

    fn with_history<T>(&self, f: impl FnOnce(&mut HistoryBuffer) -> T) -> T {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut history)
    }
}

pub struct ChatRelay {
    client: Arc<dyn CompletionClient>,
    config: RelayConfig,
    default: Arc<Session>,
    named: Mutex<LruCache<String, Arc<Session>>>,
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.named.lock().map(|s| s.len()).unwrap_or(0);
        write!(f, "ChatRelay({} via {} sessions)", self.config.model, count + 1)
    }
}

impl ChatRelay {
    pub fn new(client: Arc<dyn CompletionClient>, config: RelayConfig) -> Self {
        let limit = NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            default: Session::new(config.history_capacity),
            named: Mutex::new(LruCache::new(limit)),
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run one turn on the default session.
    pub async fn respond(&self, user_input: &str) -> Result<String, RelayError> {
        self.respond_in(DEFAULT_SESSION, user_input).await
    }

    /// Run one turn on `session_id`, creating the session if needed.
    ///
    /// The caller is expected to have rejected empty input already. If the
    /// session is cleared while the remote call is in flight, the reply is
    /// still appended once it arrives.
    pub async fn respond_in(&self, session_id: &str, user_input: &str) -> Result<String, RelayError> {
        let session = self.session_or_create(session_id);
        let _turn = session.turn.lock().await;

        let request = session.with_history(|history| {
            history.append(Role::User, user_input);
            debug!(
                session = session_id,
                turns = history.len(),
                input_len = user_input.len(),
                "relaying chat turn"
            );
            self.build_request(history)
        });

        let result = self
            .client
            .complete(&request)
            .await
            .and_then(CompletionResponse::into_reply);

        match result {
            Ok(reply) => {
                session.with_history(|history| history.append(Role::Assistant, reply.as_str()));
                debug!(session = session_id, output_len = reply.len(), "chat turn done");
                Ok(reply)
            }
            Err(e) => {
                warn!(session = session_id, error = %e, "completion request failed");
                Err(e.into())
            }
        }
    }

    /// Ordered turns of `session_id`, or `None` if it does not exist.
    ///
    /// Does not count as a use for eviction.
    pub fn history(&self, session_id: &str) -> Option<Vec<Message>> {
        let session = self.session(session_id)?;
        Some(session.with_history(|history| history.snapshot()))
    }

    /// Delete `session_id`. The default session is pinned: it is cleared
    /// instead and always reported as removed. Returns `false` for an
    /// unknown id.
    pub fn remove(&self, session_id: &str) -> bool {
        if session_id == DEFAULT_SESSION {
            self.default.with_history(HistoryBuffer::clear);
            return true;
        }
        let mut named = self.named.lock().unwrap_or_else(PoisonError::into_inner);
        named.pop(session_id).is_some()
    }

    /// Names of all sessions including the default one, sorted.
    pub fn sessions(&self) -> Vec<String> {
        let named = self.named.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = named.iter().map(|(id, _)| id.clone()).collect();
        ids.push(DEFAULT_SESSION.to_owned());
        ids.sort();
        ids
    }

    fn build_request(&self, history: &HistoryBuffer) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.config.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        messages.extend(history.iter().cloned());

        CompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
        }
    }

    fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        if session_id == DEFAULT_SESSION {
            return Some(Arc::clone(&self.default));
        }
        let named = self.named.lock().unwrap_or_else(PoisonError::into_inner);
        named.peek(session_id).cloned()
    }

    fn session_or_create(&self, session_id: &str) -> Arc<Session> {
        if session_id == DEFAULT_SESSION {
            return Arc::clone(&self.default);
        }
        let mut named = self.named.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = named.get(session_id) {
            return Arc::clone(session);
        }

        let session = Session::new(self.config.history_capacity);
        if let Some((evicted, _)) = named.push(session_id.to_owned(), Arc::clone(&session)) {
            info!(session = %evicted, limit = named.cap().get(), "evicted least recently used session");
        }
        session
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
