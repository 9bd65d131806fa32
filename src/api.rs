//! HTTP API for the chat service

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::session::SessionRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}
