//! Incremental SSE frame parsing for the manual streaming tier.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use tracing::debug;

use crate::chat::events::StreamEvent;
use crate::chat::transport::{TransportError, TransportErrorKind, TransportResult};

/// One blank-line-delimited frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event name; `message` when the frame has no `event:` field.
    pub event: String,
    pub data: String,
}

/// Buffers arriving chunks and yields complete frames.
///
/// Line endings are normalized (`\r\n` to `\n`) before boundary detection,
/// and UTF-8 sequences split across chunks are reassembled.
#[derive(Debug, Default)]
pub struct FrameParser {
    bytes: Vec<u8>,
    buffer: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes, returning every frame completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.bytes.extend_from_slice(chunk);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(s) => {
                    text.push_str(s);
                    self.bytes.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.bytes[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.bytes.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.bytes.drain(..valid + len);
                        }
                    }
                }
            }
        }
        self.push_str(&text)
    }

    /// Feeds decoded text, returning every frame completed by it.
    pub fn push_str(&mut self, text: &str) -> Vec<Frame> {
        self.buffer.push_str(text);
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = parse_frame(&block[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Ends the stream. An unterminated trailing frame is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.trim().is_empty() || !self.bytes.is_empty() {
            debug!(
                leftover = self.buffer.len() + self.bytes.len(),
                "discarding unterminated SSE frame"
            );
        }
        self.buffer.clear();
        self.bytes.clear();
    }
}

/// Parses the lines of one frame. Comment lines and unknown fields are
/// ignored; a frame with neither `event` nor `data` yields nothing.
fn parse_frame(block: &str) -> Option<Frame> {
    let mut event: Option<String> = None;
    let mut data: Option<String> = None;
    for line in block.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.trim().to_string()),
            "data" => data.get_or_insert_with(String::new).push_str(value),
            _ => {}
        }
    }
    if event.is_none() && data.is_none() {
        return None;
    }
    Some(Frame {
        event: event
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "message".to_string()),
        data: data.unwrap_or_default(),
    })
}

/// Converts a raw byte stream into [`StreamEvent`]s using [`FrameParser`].
pub struct ManualSseStream<S> {
    inner: S,
    parser: FrameParser,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

impl<S> ManualSseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: FrameParser::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

impl<S, E> Stream for ManualSseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = TransportResult<StreamEvent>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        let this = self.get_mut();
        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.done {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    for frame in this.parser.push(&chunk) {
                        if let Some(event) = StreamEvent::from_frame(&frame.event, &frame.data) {
                            this.pending.push_back(event);
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(TransportError::new(
                        TransportErrorKind::Connection,
                        format!("Stream read error: {e}"),
                    ))));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    this.parser.finish();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
