//! Server-sent events client for the nxapi presence stream.

use super::{parse_event, PresenceUpdate};
use crate::constants::{
    PRESENCE_RECONNECT_MAX_SECS, PRESENCE_RECONNECT_MIN_SECS, SSE_MAX_LINE_BYTES,
};
use crate::error::AppError;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Bytes go in as they arrive off the
/// wire; complete frames come out.
///
/// A line longer than [`SSE_MAX_LINE_BYTES`] is dropped along with the event
/// it belongs to.
#[derive(Debug, Default)]
pub struct SseParser {
    // Unterminated tail of the last chunk
    partial: Vec<u8>,
    // Inside an oversized line, skipping to its newline
    discarding: bool,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            rest = tail;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if self.partial.len() + head.len() > SSE_MAX_LINE_BYTES {
                self.drop_oversized();
                continue;
            }
            self.partial.extend_from_slice(head);
            let raw = std::mem::take(&mut self.partial);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            self.process_line(line, &mut frames);
        }

        if !self.discarding && !rest.is_empty() {
            if self.partial.len() + rest.len() > SSE_MAX_LINE_BYTES {
                self.drop_oversized();
                self.discarding = true;
            } else {
                self.partial.extend_from_slice(rest);
            }
        }
        frames
    }

    fn drop_oversized(&mut self) {
        warn!("Dropping SSE line over {SSE_MAX_LINE_BYTES} bytes");
        self.partial.clear();
        self.event = None;
        self.data.clear();
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        if line.is_empty() {
            let event = self.event.take();
            if !self.data.is_empty() {
                frames.push(SseFrame {
                    event: event.unwrap_or_else(|| "message".to_string()),
                    data: self.data.join("\n"),
                });
                self.data.clear();
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }
}

/// Long-lived subscription to a presence endpoint.
pub struct PresenceStream {
    client: reqwest::Client,
    url: Url,
}

impl PresenceStream {
    pub fn new(url: Url) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url })
    }

    /// Stream updates into `tx`, reconnecting with backoff, until cancelled or
    /// the receiver goes away.
    pub async fn run(self, tx: mpsc::Sender<PresenceUpdate>, cancel: CancellationToken) {
        let min = Duration::from_secs(PRESENCE_RECONNECT_MIN_SECS);
        let max = Duration::from_secs(PRESENCE_RECONNECT_MAX_SECS);
        let mut backoff = min;

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.connect_once(&tx) => result,
            };
            if tx.is_closed() {
                break;
            }
            let delay = match result {
                Ok(()) => {
                    info!("Presence stream closed, reconnecting");
                    backoff = min;
                    min
                }
                Err(e) => {
                    warn!("Presence stream error: {e}; retrying in {}s", backoff.as_secs());
                    let delay = backoff;
                    backoff = (backoff * 2).min(max);
                    delay
                }
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        debug!("Presence stream stopped");
    }

    async fn connect_once(&self, tx: &mpsc::Sender<PresenceUpdate>) -> Result<(), AppError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        info!("Connected to presence stream");

        let mut parser = SseParser::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for frame in parser.feed(&chunk) {
                let Some(update) = parse_event(&frame.event, &frame.data) else {
                    continue;
                };
                if tx.send(update).await.is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.into(),
            data: data.into(),
        }
    }

    #[test]
    fn test_parses_named_event() {
        let mut parser = SseParser::default();
        let frames = parser.feed(b"event: title\ndata: {\"id\":\"x\"}\n\n");
        assert_eq!(frames, vec![frame("title", "{\"id\":\"x\"}")]);
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: ti").is_empty());
        assert!(parser.feed(b"tle\r\ndata: {}").is_empty());
        let frames = parser.feed(b"\r\n\r\n");
        assert_eq!(frames, vec![frame("title", "{}")]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut parser = SseParser::default();
        let frames = parser.feed(b": keepalive\ndata: a\ndata:b\n\nevent: friend\ndata: c\n\n");
        assert_eq!(frames, vec![frame("message", "a\nb"), frame("friend", "c")]);
    }

    #[test]
    fn test_event_without_data_is_dropped() {
        let mut parser = SseParser::default();
        let frames = parser.feed(b"event: title\n\ndata: x\n\n");
        assert_eq!(frames, vec![frame("message", "x")]);
    }

    #[test]
    fn test_oversized_line_is_dropped_and_parser_recovers() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: title\ndata: ").is_empty());
        assert!(parser.feed(&vec![b'x'; SSE_MAX_LINE_BYTES]).is_empty());
        assert!(parser.partial.is_empty());
        assert!(parser.feed(&vec![b'y'; 1024]).is_empty());
        assert!(parser.partial.is_empty());

        let frames = parser.feed(b"yyy\n\ndata: ok\n\n");
        assert_eq!(frames, vec![frame("message", "ok")]);
    }

    #[test]
    fn test_oversized_line_within_one_chunk_is_dropped() {
        let mut parser = SseParser::default();
        let mut chunk = b"data: ".to_vec();
        chunk.extend(vec![b'x'; SSE_MAX_LINE_BYTES]);
        chunk.extend_from_slice(b"\n\nevent: title\ndata: {}\n\n");
        assert_eq!(parser.feed(&chunk), vec![frame("title", "{}")]);
    }

    #[test]
    fn test_multibyte_utf8_split_across_chunks() {
        let mut parser = SseParser::default();
        let bytes = "data: ゼルダ\n\n".as_bytes();
        let (head, tail) = bytes.split_at(8);
        assert!(parser.feed(head).is_empty());
        assert_eq!(parser.feed(tail), vec![frame("message", "ゼルダ")]);
    }
}
