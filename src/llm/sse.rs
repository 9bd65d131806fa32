//! Server-Sent Events decoding for streaming responses.
//!
//! The chat-completions endpoint answers `stream: true` requests with an
//! SSE body: one `data: {...}` line per delta, a blank line between events,
//! and a final `data: [DONE]`.

use super::error::InferenceError;
use futures::stream::{Stream, StreamExt};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type, when the server names one.
    pub event: Option<String>,
    /// The event data; multi-line data is joined with `\n`.
    pub data: String,
}

/// Line-oriented SSE parser.
#[derive(Debug, Default)]
pub struct SseParser {
    current_event: Option<String>,
    current_data: String,
    has_data: bool,
}

impl SseParser {
    /// Feed one line (without its terminator). Returns an event when the
    /// line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take_event();
        }

        if line.starts_with(':') {
            // comment / keep-alive
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.current_event = Some(value.to_string()),
            "data" => {
                if self.has_data {
                    self.current_data.push('\n');
                }
                self.current_data.push_str(value);
                self.has_data = true;
            }
            // id:, retry:
            _ => {}
        }
        None
    }

    /// Flush an event left open when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        self.take_event()
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        let event = self.current_event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.current_data),
        })
    }
}

/// Turn a streaming response body into a lazy stream of SSE events.
pub fn sse_events(
    response: reqwest::Response,
) -> impl Stream<Item = Result<SseEvent, InferenceError>> + Send {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let lines = tokio::io::BufReader::new(StreamReader::new(byte_stream)).lines();

    futures::stream::try_unfold(
        (lines, SseParser::default(), false),
        |(mut lines, mut parser, done)| async move {
            if done {
                return Ok::<_, InferenceError>(None);
            }
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| InferenceError::transport(format!("Stream read failed: {e}")))?
            {
                if let Some(event) = parser.push_line(&line) {
                    return Ok(Some((event, (lines, parser, false))));
                }
            }
            Ok(parser.finish().map(|event| (event, (lines, parser, true))))
        },
    )
}
