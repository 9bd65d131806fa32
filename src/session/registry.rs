//! Session lookup according to the configured history scope

use super::{ChatSession, SessionSettings};
use crate::config::HistoryScope;
use crate::llm::InferenceClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Id reported by the process-wide session
pub const SHARED_SESSION_ID: &str = "shared";

pub const DEFAULT_MAX_SESSIONS: usize = 256;
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    session: Arc<ChatSession>,
    last_used: Instant,
}

/// Manager for all chat sessions
pub struct SessionRegistry {
    scope: HistoryScope,
    client: Arc<dyn InferenceClient>,
    settings: SessionSettings,
    shared: Arc<ChatSession>,
    max_sessions: usize,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(scope: HistoryScope, client: Arc<dyn InferenceClient>, settings: SessionSettings) -> Self {
        let shared = Arc::new(ChatSession::new(
            SHARED_SESSION_ID,
            client.clone(),
            settings.clone(),
        ));
        Self {
            scope,
            client,
            settings,
            shared,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: DEFAULT_SESSION_IDLE,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the per-session map. Only consulted in per-session scope.
    pub fn with_limits(mut self, max_sessions: usize, idle_timeout: Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn scope(&self) -> HistoryScope {
        self.scope
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Register a session for a client that has none yet and return its id
    pub async fn create_session(&self) -> String {
        match self.scope {
            HistoryScope::Shared => SHARED_SESSION_ID.to_string(),
            HistoryScope::PerSession => {
                let id = uuid::Uuid::new_v4().to_string();
                self.get_or_create(&id).await;
                id
            }
        }
    }

    /// Look up an existing session without creating one.
    ///
    /// With shared scope every id resolves to the same session.
    pub async fn get(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        if self.scope == HistoryScope::Shared {
            return Some(self.shared.clone());
        }

        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(session_id).map(|entry| {
            entry.last_used = Instant::now();
            entry.session.clone()
        })
    }

    /// Resolve a session id, creating the session on first use.
    ///
    /// Creating a session first evicts sessions that sat idle past the
    /// timeout, then the least recently used ones while the map is full.
    /// Sessions with a reply in flight or a connected watcher are kept.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<ChatSession> {
        if self.scope == HistoryScope::Shared {
            return self.shared.clone();
        }

        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = now;
            return entry.session.clone();
        }

        self.evict(&mut sessions, now);

        tracing::info!(session = %session_id, live = sessions.len(), "Creating session");
        let session = Arc::new(ChatSession::new(
            session_id,
            self.client.clone(),
            self.settings.clone(),
        ));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    fn evict(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        sessions.retain(|id, entry| {
            let expired = now.duration_since(entry.last_used) >= self.idle_timeout
                && entry.session.is_evictable();
            if expired {
                tracing::debug!(session = %id, "Evicting idle session");
            }
            !expired
        });

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| entry.session.is_evictable())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            let Some(id) = oldest else {
                tracing::warn!(live = sessions.len(), "Session cap reached with every session active");
                break;
            };
            tracing::debug!(session = %id, "Evicting least recently used session");
            sessions.remove(&id);
        }
    }
}
