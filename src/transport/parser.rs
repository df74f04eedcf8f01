//! Incremental parser for the line-framed notification stream.
//!
//! The stream endpoint emits frames of the form:
//!
//! ```text
//! event: notification
//! data: {"token": "...", ...}
//! ```
//!
//! Chunks arrive with arbitrary boundaries, so the parser buffers bytes and
//! only consumes complete lines; a partial trailing line waits for the next
//! chunk. Consumed lines are drained and never reprocessed. Only `data:`
//! lines under the `notification` event name are parsed; payloads that fail
//! to parse are logged and dropped without aborting the stream.

use crate::infrastructure::metrics::TransportMetrics;
use crate::notification::NotificationItem;

/// Event name whose `data:` lines carry notification payloads
pub const NOTIFICATION_EVENT: &str = "notification";

/// Stateful line framer for the notification stream
pub struct EventStreamParser {
    /// Unconsumed bytes, at most one partial line
    buffer: Vec<u8>,
    /// Event name set by the last `event:` line
    pending_event: Option<String>,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            pending_event: None,
        }
    }

    /// Feed one chunk and collect the notifications it completed.
    ///
    /// The pending event name persists across chunks and across `data:`
    /// lines until the next `event:` line replaces it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<NotificationItem> {
        self.buffer.extend_from_slice(chunk);

        let mut items = Vec::new();
        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return items;
        };

        // Lines end at '\n', so draining up to the last one keeps multi-byte
        // characters inside a line intact even when chunks split them.
        let complete: Vec<u8> = self.buffer.drain(..=last_newline).collect();
        for raw in complete.split(|&b| b == b'\n') {
            if raw.is_empty() {
                continue;
            }
            let line = String::from_utf8_lossy(raw);
            self.handle_line(line.trim_end_matches('\r'), &mut items);
        }

        items
    }

    /// Number of bytes waiting for a line terminator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn handle_line(&mut self, line: &str, items: &mut Vec<NotificationItem>) {
        if let Some(name) = line.strip_prefix("event:") {
            self.pending_event = Some(name.trim().to_string());
        } else if let Some(payload) = line.strip_prefix("data:") {
            if self.pending_event.as_deref() != Some(NOTIFICATION_EVENT) {
                tracing::trace!(event = ?self.pending_event, "Ignoring data line for other event");
                return;
            }
            match serde_json::from_str::<NotificationItem>(payload.trim()) {
                Ok(item) => items.push(item),
                Err(e) => {
                    TransportMetrics::record_parse_failure("stream");
                    tracing::warn!(error = %e, "Dropping unparseable stream payload");
                }
            }
        }
        // Comments, ids, retries, and blank lines carry nothing for us
    }
}

impl Default for EventStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_json(token: &str) -> String {
        format!(
            r#"{{"token": "{}", "title": "Test", "event": "test.event", "created": "2024-05-01T12:00:00Z"}}"#,
            token
        )
    }

    #[test]
    fn test_complete_frame_parses() {
        let mut parser = EventStreamParser::new();
        let chunk = format!("event: notification\ndata: {}\n", item_json("a"));

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].token, "a");
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_split_data_line_waits_for_completion() {
        let mut parser = EventStreamParser::new();
        let json = item_json("a");
        let (head, tail) = json.split_at(json.len() / 2);

        assert!(parser.push(b"event: notification\n").is_empty());
        assert!(parser.push(format!("data: {}", head).as_bytes()).is_empty());
        assert!(parser.buffered() > 0);

        let items = parser.push(format!("{}\n", tail).as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].token, "a");
    }

    #[test]
    fn test_lines_are_never_reprocessed() {
        let mut parser = EventStreamParser::new();
        let frame = format!("event: notification\ndata: {}\n", item_json("a"));

        let mut total = 0;
        for byte in frame.as_bytes() {
            total += parser.push(&[*byte]).len();
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn test_data_without_event_name_is_ignored() {
        let mut parser = EventStreamParser::new();
        let items = parser.push(format!("data: {}\n", item_json("a")).as_bytes());
        assert!(items.is_empty());
    }

    #[test]
    fn test_other_event_names_are_ignored() {
        let mut parser = EventStreamParser::new();
        let chunk = format!(
            "event: heartbeat\ndata: {{\"ts\": 1}}\nevent: notification\ndata: {}\n",
            item_json("a")
        );

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].token, "a");
    }

    #[test]
    fn test_event_name_persists_across_data_lines() {
        let mut parser = EventStreamParser::new();
        let chunk = format!(
            "event: notification\ndata: {}\ndata: {}\n",
            item_json("a"),
            item_json("b")
        );

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].token, "b");
    }

    #[test]
    fn test_parse_failure_skips_payload_and_continues() {
        let mut parser = EventStreamParser::new();
        let chunk = format!(
            "event: notification\ndata: {{not json\ndata: {}\n",
            item_json("ok")
        );

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].token, "ok");
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = EventStreamParser::new();
        let chunk = format!("event: notification\r\ndata: {}\r\n", item_json("a"));

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut parser = EventStreamParser::new();
        let chunk = format!(
            "event: notification\ndata: {}\n\nevent: notification\ndata: {}\n",
            item_json("a"),
            item_json("b")
        );

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut parser = EventStreamParser::new();
        let json = r#"{"token": "a", "title": "café", "event": "test", "created": "2024-05-01T12:00:00Z"}"#;
        let frame = format!("event: notification\ndata: {}\n", json);
        let bytes = frame.as_bytes();

        // Split inside the two-byte 'é' sequence
        let split = frame.find("af").unwrap() + 3;
        assert!(parser.push(&bytes[..split]).is_empty());

        let items = parser.push(&bytes[split..]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "café");
    }

    #[test]
    fn test_no_space_after_colon() {
        let mut parser = EventStreamParser::new();
        let chunk = format!("event:notification\ndata:{}\n", item_json("a"));

        let items = parser.push(chunk.as_bytes());
        assert_eq!(items.len(), 1);
    }
}
