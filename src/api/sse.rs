//! Server-Sent Events support

use crate::session::{SessionEvent, SessionSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    snapshot: SessionSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(init_event(&snapshot)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_axum(&event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[derive(Serialize)]
#[serde(tag = "type", rename = "init")]
struct InitPayload<'a> {
    #[serde(flatten)]
    snapshot: &'a SessionSnapshot,
}

fn init_event(snapshot: &SessionSnapshot) -> Event {
    let data = serde_json::to_string(&InitPayload { snapshot })
        .unwrap_or_else(|_| json!({ "type": "init" }).to_string());
    Event::default().event("init").data(data)
}

fn session_event_to_axum(event: &SessionEvent) -> Event {
    let event_type = match event {
        SessionEvent::Turn { .. } => "turn",
        SessionEvent::Cleared => "cleared",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| json!({ "type": event_type }).to_string());
    Event::default().event(event_type).data(data)
}
