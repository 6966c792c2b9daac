//! Incremental `text/event-stream` parser
//!
//! Bytes arrive in arbitrary chunks from the HTTP body; the parser keeps the
//! partial line between calls and yields complete events on blank lines.
//! Line endings may be `\n`, `\r\n` or `\r`.

use std::time::Duration;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// `event:` field, `None` for the default "message" type
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream
    pub id: Option<String>,
}

impl SseEvent {
    /// True for events an `EventSource.onmessage` handler would receive
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Stateful parser fed with raw body chunks
#[derive(Debug, Default)]
pub struct SseParser {
    line: Vec<u8>,
    after_cr: bool,
    started: bool,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay requested by the server through `retry:`
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Feed a chunk and collect the events it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let raw = std::mem::take(&mut self.line);
                    let line = String::from_utf8_lossy(&raw);
                    let line = if self.started {
                        &*line
                    } else {
                        self.started = true;
                        line.strip_prefix('\u{feff}').unwrap_or(&*line)
                    };
                    if let Some(event) = self.process_line(line) {
                        events.push(event);
                    }
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
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
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {\"streamTitle\":\"A\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"streamTitle\":\"A\"}");
        assert!(events[0].is_message());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"da").is_empty());
        assert!(parser.feed(b"ta: hel").is_empty());
        assert!(parser.feed(b"lo\n").is_empty());
        let events = parser.feed(b"\n");
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_multiline_data_and_crlf() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\r\ndata: two\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "one\ntwo");
    }

    #[test]
    fn test_cr_split_from_lf_between_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: x\r").is_empty());
        // The LF completing the CRLF must not count as a blank line
        assert!(parser.feed(b"\n").is_empty());
        assert_eq!(parser.feed(b"\r\n").len(), 1);
    }

    #[test]
    fn test_comments_and_named_events() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\n\nevent: ping\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.as_deref(), Some("ping"));
        assert!(!events[0].is_message());
        assert!(events[1].is_message());
    }

    #[test]
    fn test_id_persists_and_retry_is_recorded() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"id: 7\nretry: 2500\ndata: a\n\ndata: b\n\n");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].id.as_deref(), Some("7"));
        assert_eq!(parser.retry(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_field_without_colon_and_without_space() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data\ndata:x\n\n");
        assert_eq!(events[0].data, "\nx");
    }

    #[test]
    fn test_leading_bom_is_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed("\u{feff}data: z\n\n".as_bytes());
        assert_eq!(events[0].data, "z");
    }
}
