//! Minimal server-sent-events decoding: only `data:` fields matter to the
//! vendors we talk to.

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;

use super::ProviderError;

/// Terminal sentinel sent by OpenAI-compatible APIs.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder that turns arbitrary byte chunks into complete event
/// payloads. Multi-line `data:` fields are joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim_end_matches(['\n', '\r']);
        if !rest.is_empty() {
            self.process_line(rest);
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // comments, `event:`, `id:` and `retry:` carry nothing we use
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

/// One decoded stream item. `Done` is only produced for the
/// [`DONE_SENTINEL`]; vendors without a sentinel signal completion in a
/// `Data` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Data(Value),
    Done,
}

pub type ChunkStream = BoxStream<'static, Result<StreamEvent, ProviderError>>;

struct DecodeState {
    bytes: BoxStream<'static, Result<Bytes, ProviderError>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Decodes a body stream into parsed JSON event payloads. The
/// [`DONE_SENTINEL`] is yielded as [`StreamEvent::Done`] and ends the stream;
/// a read error is yielded once and then terminates it.
pub fn json_events<S, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let state = DecodeState {
        bytes: bytes
            .map(|chunk| chunk.map_err(|e| ProviderError::Transport(e.to_string())))
            .boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                if payload.trim() == DONE_SENTINEL {
                    state.pending.clear();
                    state.finished = true;
                    return Some((Ok(StreamEvent::Done), state));
                }
                let parsed = serde_json::from_str(&payload)
                    .map(StreamEvent::Data)
                    .map_err(ProviderError::from);
                return Some((parsed, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(&chunk);
                    state.pending.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    #[test]
    fn test_decoder_handles_split_lines_and_crlf() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.feed(b": 1}\r\n\r\n"), vec!["{\"a\": 1}".to_string()]);
    }

    #[test]
    fn test_decoder_ignores_non_data_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b": ping\nevent: message_start\ndata: x\nid: 4\n\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn test_decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn test_json_events_stop_at_done() {
        let body = chunks(vec![
            "data: {\"n\":1}\n\n",
            "data: {\"n\"",
            ":2}\n\ndata: [DONE]\n\n",
            "data: {\"n\":3}\n\n",
        ]);
        let events: Vec<StreamEvent> = json_events(body).map(|v| v.unwrap()).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Data(json!({"n": 1})),
                StreamEvent::Data(json!({"n": 2})),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_json_events_without_sentinel_end_with_the_body() {
        let body = chunks(vec!["data: {\"type\":\"message_stop\"}\n\n"]);
        let events: Vec<StreamEvent> = json_events(body).map(|v| v.unwrap()).collect().await;
        assert_eq!(events, vec![StreamEvent::Data(json!({"type": "message_stop"}))]);
    }

    #[tokio::test]
    async fn test_json_events_surface_invalid_payload() {
        let body = chunks(vec!["data: not json\n\n"]);
        let items: Vec<_> = json_events(body).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ProviderError::InvalidJson(_))));
    }

    #[tokio::test]
    async fn test_json_events_end_after_read_error() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"n\":1}\n\n")),
            Err(std::io::Error::other("reset")),
            Ok(Bytes::from_static(b"data: {\"n\":2}\n\n")),
        ]);
        let items: Vec<_> = json_events(body).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ProviderError::Transport(_))));
    }
}
