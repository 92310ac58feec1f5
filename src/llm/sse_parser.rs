// ABOUTME: Line-buffering SSE (Server-Sent Events) parser for provider streaming responses
// ABOUTME: Handles partial lines and split UTF-8 sequences across TCP chunk boundaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! Network chunks do not line up with SSE event boundaries. A chunk may carry
//! several events, half of one, or end in the middle of a multi-byte UTF-8
//! character. [`SseLineBuffer`] keeps raw bytes until a full line arrives and
//! only then decodes it, so none of those cases lose or corrupt data.
//!
//! The provider supplies a `parse_data` closure turning one `data:` payload
//! into a [`StreamChunk`]; framing and `[DONE]` detection live here.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{future, Stream, StreamExt};

use super::{error_chain, ChatStream, StreamChunk, UpstreamError};

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload (prefix stripped)
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Longest single SSE line accepted from a provider
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Line-buffering SSE parser
#[derive(Debug)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
    // Bytes already searched for a newline
    scanned: usize,
    max_line_bytes: usize,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::with_line_limit(MAX_LINE_BYTES)
    }
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that rejects lines longer than `max_line_bytes`
    #[must_use]
    pub const fn with_line_limit(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    /// Append bytes, returning every event completed by them
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Stream`] once a line grows past the limit; the
    /// buffer is cleared and the stream cannot be resumed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, UpstreamError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut line_start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let line_end = search_from + offset;
            if line_end - line_start > self.max_line_bytes {
                return Err(self.overflow());
            }
            if let Some(event) = parse_line(&self.buffer[line_start..line_end]) {
                events.push(event);
            }
            line_start = line_end + 1;
            search_from = line_start;
        }

        self.buffer.drain(..line_start);
        self.scanned = self.buffer.len();
        if self.scanned > self.max_line_bytes {
            return Err(self.overflow());
        }
        Ok(events)
    }

    /// Parse whatever is left once the byte stream ends
    pub fn flush(&mut self) -> Vec<SseEvent> {
        self.scanned = 0;
        let remaining = mem::take(&mut self.buffer);
        parse_line(&remaining).into_iter().collect()
    }

    fn overflow(&mut self) -> UpstreamError {
        self.buffer.clear();
        self.scanned = 0;
        UpstreamError::Stream(format!(
            "SSE line exceeded {} bytes",
            self.max_line_bytes
        ))
    }
}

fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();

    // Comments (":"), blank separators, and event:/id:/retry: fields carry no payload
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(data.to_owned()))
}

struct SseStreamState {
    parser: SseLineBuffer,
    pending: VecDeque<Result<StreamChunk, UpstreamError>>,
    stream_ended: bool,
}

impl SseStreamState {
    fn enqueue<F>(&mut self, events: Vec<SseEvent>, parse_data: &F)
    where
        F: Fn(&str) -> Option<Result<StreamChunk, UpstreamError>>,
    {
        for event in events {
            match event {
                SseEvent::Data(json) => {
                    if let Some(result) = parse_data(&json) {
                        self.pending.push_back(result);
                    }
                }
                SseEvent::Done => self.pending.push_back(Ok(StreamChunk::finished("stop"))),
            }
        }
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Wrap a provider byte stream with SSE framing
///
/// `parse_data` returns `None` for payloads that produce no output
/// (metadata-only chunks). Empty non-final deltas are dropped. A transport
/// error or an oversized line ends the stream after yielding
/// [`UpstreamError::Stream`].
pub fn create_sse_stream<S, F>(byte_stream: S, parse_data: F) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, UpstreamError>> + Send + 'static,
{
    let state = SseStreamState {
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        stream_ended: false,
    };

    let stream = unfold(
        (Box::pin(byte_stream) as ByteStream, state, parse_data),
        |(mut byte_stream, mut state, parse_data)| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, (byte_stream, state, parse_data)));
                }
                if state.stream_ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => match state.parser.feed(&bytes) {
                        Ok(events) => state.enqueue(events, &parse_data),
                        Err(e) => {
                            state.stream_ended = true;
                            state.pending.push_back(Err(e));
                        }
                    },
                    Some(Err(e)) => {
                        state.stream_ended = true;
                        state
                            .pending
                            .push_back(Err(UpstreamError::Stream(error_chain(&e))));
                    }
                    None => {
                        state.stream_ended = true;
                        let events = state.parser.flush();
                        state.enqueue(events, &parse_data);
                    }
                }
            }
        },
    );

    let filtered = stream.filter(|result| {
        future::ready(
            result
                .as_ref()
                .map_or(true, |chunk| !chunk.delta.is_empty() || chunk.is_final),
        )
    });

    Box::pin(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut parser = SseLineBuffer::new();
        let events = parser.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n").unwrap();
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"a\":1}".to_owned()),
                SseEvent::Data("{\"b\":2}".to_owned()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut parser = SseLineBuffer::new();
        assert!(parser.feed(b"data: {\"con").unwrap().is_empty());
        assert_eq!(
            parser.feed(b"tent\":\"hi\"}\n").unwrap(),
            vec![SseEvent::Data("{\"content\":\"hi\"}".to_owned())]
        );
    }

    #[test]
    fn test_split_utf8_character_survives() {
        let mut parser = SseLineBuffer::new();
        let line = "data: café\n".as_bytes();
        let split = line.len() - 2; // inside the two-byte 'é'
        assert!(parser.feed(&line[..split]).unwrap().is_empty());
        assert_eq!(
            parser.feed(&line[split..]).unwrap(),
            vec![SseEvent::Data("café".to_owned())]
        );
    }

    #[test]
    fn test_non_data_fields_and_crlf() {
        let mut parser = SseLineBuffer::new();
        let events = parser.feed(b": keep-alive\r\nevent: message\r\nid: 7\r\ndata:{\"x\":1}\r\n\r\n").unwrap();
        assert_eq!(events, vec![SseEvent::Data("{\"x\":1}".to_owned())]);
    }

    #[test]
    fn test_line_split_across_many_feeds() {
        let mut parser = SseLineBuffer::new();
        for byte in b"data: {\"content\":\"slow\"}" {
            assert!(parser.feed(&[*byte]).unwrap().is_empty());
        }
        assert_eq!(
            parser.feed(b"\n").unwrap(),
            vec![SseEvent::Data("{\"content\":\"slow\"}".to_owned())]
        );
    }

    #[test]
    fn test_oversized_line_is_rejected() {
        let mut parser = SseLineBuffer::with_line_limit(16);
        assert_eq!(
            parser.feed(b"data: short\n").unwrap(),
            vec![SseEvent::Data("short".to_owned())]
        );
        assert!(parser.feed(b"data: 0123456789").unwrap().is_empty());
        let err = parser.feed(b"abcdef").unwrap_err();
        assert!(matches!(err, UpstreamError::Stream(ref m) if m.contains("16 bytes")));
        assert!(parser.flush().is_empty());
    }

    #[test]
    fn test_oversized_complete_line_is_rejected() {
        let mut parser = SseLineBuffer::with_line_limit(8);
        assert!(parser.feed(b"data: far too long\n").is_err());
    }

    #[test]
    fn test_flush_emits_trailing_line() {
        let mut parser = SseLineBuffer::new();
        assert!(parser.feed(b"data: [DONE]").unwrap().is_empty());
        assert_eq!(parser.flush(), vec![SseEvent::Done]);
        assert!(parser.flush().is_empty());
    }

    #[tokio::test]
    async fn test_stream_preserves_order_and_drops_empty_deltas() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: one\n\ndata: \n\ndata: tw")),
            Ok(Bytes::from_static(b"o\n\ndata: skip\n\ndata: three\n\ndata: [DONE]\n\n")),
        ];

        let parse = |data: &str| match data {
            "skip" => None,
            other => Some(Ok(StreamChunk::delta(other))),
        };

        let collected: Vec<StreamChunk> = create_sse_stream(stream::iter(chunks), parse)
            .map(|r| r.unwrap())
            .collect()
            .await;

        let deltas: Vec<&str> = collected.iter().map(|c| c.delta.as_str()).collect();
        assert_eq!(deltas, vec!["one", "two", "three", ""]);
        assert!(collected.last().unwrap().is_final);
    }
}
