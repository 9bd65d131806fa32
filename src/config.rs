//! Service configuration read from the environment

use crate::llm::{GenerationParams, API_KEY_ENV_VAR, DEFAULT_ENDPOINT};
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

/// Who shares a conversation history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    /// One history for every client of the process
    #[default]
    Shared,
    /// One history per session id
    PerSession,
}

impl HistoryScope {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shared" | "global" => Some(Self::Shared),
            "session" | "per_session" | "per-session" => Some(Self::PerSession),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub generation: GenerationParams,
    pub streaming: bool,
    pub history_scope: HistoryScope,
    /// Per-session scope only: live session cap and idle eviction age
    pub max_sessions: usize,
    pub session_idle: Duration,
    pub timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = GenerationParams::default();

        let generation = GenerationParams {
            model: lookup("CHAT_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.model),
            temperature: parse_var(&lookup, "CHAT_TEMPERATURE").unwrap_or(defaults.temperature),
            max_tokens: parse_var(&lookup, "CHAT_MAX_TOKENS").unwrap_or(defaults.max_tokens),
            top_p: parse_var(&lookup, "CHAT_TOP_P").unwrap_or(defaults.top_p),
        };

        Self {
            api_key: lookup(API_KEY_ENV_VAR),
            endpoint: lookup("CHAT_API_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            generation,
            streaming: lookup("CHAT_STREAMING")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            history_scope: lookup("CHAT_HISTORY_SCOPE")
                .and_then(|v| HistoryScope::parse(&v))
                .unwrap_or_default(),
            max_sessions: parse_var(&lookup, "CHAT_MAX_SESSIONS").unwrap_or(DEFAULT_MAX_SESSIONS),
            session_idle: parse_var(&lookup, "CHAT_SESSION_IDLE_SECS")
                .map_or(DEFAULT_SESSION_IDLE, Duration::from_secs),
            timeout: Duration::from_secs(parse_var(&lookup, "CHAT_TIMEOUT_SECS").unwrap_or(300)),
            port: parse_var(&lookup, "CHAT_PORT").unwrap_or(7870),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
