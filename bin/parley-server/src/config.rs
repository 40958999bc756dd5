//! Server configuration, loaded from environment variables at startup.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use parley_core::client::openai::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use parley_core::history::DEFAULT_CAPACITY;
use parley_core::relay::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use parley_core::{DEFAULT_MAX_SESSIONS, OpenAiConfig, RelayConfig};
use thiserror::Error;

/// Variable holding the completion API credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Accepted values for `PARLEY_HISTORY_CAPACITY`.
pub const HISTORY_CAPACITY_RANGE: RangeInclusive<usize> = 1..=1000;
/// Accepted values for `PARLEY_MAX_SESSIONS`.
pub const MAX_SESSIONS_RANGE: RangeInclusive<usize> = 1..=100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("{var}={value} is out of range ({min}..={max})")]
    OutOfRange {
        var: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

/// Runtime configuration for parley-server.
///
/// Everything except the API key has a default so a bare `OPENAI_API_KEY` is
/// enough to start the server.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Credential for the completion API.
    pub api_key: String,

    /// OpenAI-compatible endpoint prefix.
    pub openai_base_url: String,

    /// Upper bound on one completion call.
    pub request_timeout: Duration,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// `max_tokens` sent with every completion request.
    pub max_tokens: u32,

    /// Turns retained per session.
    pub history_capacity: usize,

    /// Named sessions kept before the least recently used one is evicted.
    pub max_sessions: usize,

    /// Optional system message prepended to every request.
    pub system_prompt: Option<String>,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("history_capacity", &self.history_capacity)
            .field("max_sessions", &self.max_sessions)
            .field("system_prompt", &self.system_prompt)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_swagger", &self.enable_swagger)
            .finish()
    }
}

impl Config {
    /// Build [`Config`] from the process environment, after merging a `.env`
    /// file from the working directory if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(API_KEY_VAR))?;

        Ok(Self {
            bind_address: lookup("PARLEY_BIND").unwrap_or_else(|| "0.0.0.0:5000".to_owned()),
            log_level: lookup("PARLEY_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: flag(&lookup, "PARLEY_LOG_JSON", false),
            api_key,
            openai_base_url: lookup("PARLEY_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            request_timeout: Duration::from_secs(parse(
                &lookup,
                "PARLEY_REQUEST_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )),
            model: lookup("PARLEY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            max_tokens: parse(&lookup, "PARLEY_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            history_capacity: bounded(
                &lookup,
                "PARLEY_HISTORY_CAPACITY",
                DEFAULT_CAPACITY,
                HISTORY_CAPACITY_RANGE,
            )?,
            max_sessions: bounded(
                &lookup,
                "PARLEY_MAX_SESSIONS",
                DEFAULT_MAX_SESSIONS,
                MAX_SESSIONS_RANGE,
            )?,
            system_prompt: lookup("PARLEY_SYSTEM_PROMPT").filter(|v| !v.trim().is_empty()),
            cors_allowed_origins: lookup("PARLEY_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            enable_swagger: flag(&lookup, "PARLEY_ENABLE_SWAGGER", true),
        })
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.api_key.as_str())
            .with_base_url(self.openai_base_url.as_str())
            .with_timeout(self.request_timeout)
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            history_capacity: self.history_capacity,
            system_prompt: self.system_prompt.clone(),
            max_sessions: self.max_sessions,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`parse`], but a parsed value outside `range` is an error.
fn bounded<F>(
    lookup: &F,
    key: &'static str,
    default: usize,
    range: RangeInclusive<usize>,
) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse(lookup, key, default);
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            var: key,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// A missing `.env` is the normal case in production; an unreadable or
/// malformed one is not.
fn load_dotenv(result: Result<PathBuf, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
