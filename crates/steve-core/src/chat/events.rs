//! Typed stream events and payload decoding.
//!
//! Every `data:` field may be JSON or raw text. Decoding is explicit: each
//! payload records whether it came from JSON or fell back to the raw string.

use serde_json::Value;
use steve_types::Citation;
use tracing::debug;

/// A text payload (`token` or `error` data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPayload {
    /// Decoded from a JSON value.
    Json(String),
    /// Not decodable; used verbatim.
    Raw(String),
}

impl TextPayload {
    /// Decodes `token` data: a JSON string, else the raw data.
    pub fn decode_token(data: &str) -> Self {
        match serde_json::from_str::<Value>(data) {
            Ok(Value::String(s)) => TextPayload::Json(s),
            _ => TextPayload::Raw(data.to_string()),
        }
    }

    /// Decodes `error` data: a JSON string, or an object carrying a
    /// `message`/`detail`/`error` string, else the raw data.
    pub fn decode_error(data: &str) -> Self {
        match serde_json::from_str::<Value>(data) {
            Ok(Value::String(s)) => TextPayload::Json(s),
            Ok(Value::Object(obj)) => ["message", "detail", "error"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map_or_else(
                    || TextPayload::Raw(data.to_string()),
                    |s| TextPayload::Json(s.to_string()),
                ),
            _ => TextPayload::Raw(data.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TextPayload::Json(s) | TextPayload::Raw(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            TextPayload::Json(s) | TextPayload::Raw(s) => s,
        }
    }
}

/// A `sources` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcesPayload {
    Citations(Vec<Citation>),
    /// The data was not a citation array; carries the raw data.
    Malformed(String),
}

impl SourcesPayload {
    pub fn decode(data: &str) -> Self {
        match serde_json::from_str::<Vec<Citation>>(data) {
            Ok(citations) => SourcesPayload::Citations(citations),
            Err(e) => {
                debug!(error = %e, "malformed sources payload");
                SourcesPayload::Malformed(data.to_string())
            }
        }
    }
}

/// One event from a chat stream, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(TextPayload),
    Sources(SourcesPayload),
    Error(TextPayload),
}

impl StreamEvent {
    /// Builds an event from a frame's event name and data.
    ///
    /// Returns `None` for event names the pipeline does not consume
    /// (`done`, the default `message`, keep-alives).
    pub fn from_frame(event: &str, data: &str) -> Option<Self> {
        match event {
            "token" => Some(StreamEvent::Token(TextPayload::decode_token(data))),
            "sources" => Some(StreamEvent::Sources(SourcesPayload::decode(data))),
            "error" => Some(StreamEvent::Error(TextPayload::decode_error(data))),
            _ => None,
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        StreamEvent::Token(TextPayload::Json(text.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error(TextPayload::Json(message.into()))
    }
}
