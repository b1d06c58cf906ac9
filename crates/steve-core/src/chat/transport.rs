//! Transport seam and error taxonomy.

use std::fmt;

use futures_util::stream::BoxStream;
use serde_json::Value;
use steve_types::{ChatReply, ChatRequest};

use crate::chat::events::StreamEvent;

/// Categories of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The tier is not available in this runtime (disabled or unsupported).
    Unavailable,
    /// Non-success HTTP status.
    HttpStatus,
    /// Could not connect, or the connection broke mid-stream.
    Connection,
    /// Request or chunk wait exceeded its cap.
    Timeout,
    /// The response body could not be decoded.
    Parse,
    /// The turn was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Unavailable => write!(f, "unavailable"),
            TransportErrorKind::HttpStatus => write!(f, "http_status"),
            TransportErrorKind::Connection => write!(f, "connection"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Parse => write!(f, "parse"),
            TransportErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Structured transport error with kind and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// One-line summary suitable for display.
    pub message: String,
    /// Optional raw detail (e.g. the response body).
    pub details: Option<String>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a readable message out of a
    /// JSON body when there is one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        if body.trim().is_empty() {
            return Self::new(TransportErrorKind::HttpStatus, message);
        }
        let extracted = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.get("detail")
                .and_then(Value::as_str)
                .or_else(|| {
                    json.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string)
        });
        Self {
            kind: TransportErrorKind::HttpStatus,
            message: match extracted {
                Some(msg) => format!("{message}: {msg}"),
                None => message,
            },
            details: Some(body.to_string()),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "Cancelled")
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Boxed stream of chat events.
pub type EventStream = BoxStream<'static, TransportResult<StreamEvent>>;

/// The three ways a chat turn can reach the service.
///
/// Tiers never run concurrently; the controller awaits one before trying the
/// next.
#[allow(async_fn_in_trait)]
pub trait ChatTransport {
    /// Tier 1: the preferred event-stream client.
    async fn open_event_source(&self, request: &ChatRequest) -> TransportResult<EventStream>;

    /// Tier 2: a streaming request whose body is parsed by hand.
    async fn open_manual_stream(&self, request: &ChatRequest) -> TransportResult<EventStream>;

    /// Tier 3: a single non-streaming request.
    async fn send_sync(&self, request: &ChatRequest) -> TransportResult<ChatReply>;
}

/// Maps a reqwest failure onto the transport taxonomy.
pub fn classify_reqwest_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        TransportError::new(
            TransportErrorKind::Connection,
            format!("Connection failed: {e}"),
        )
    } else if e.is_decode() {
        TransportError::new(TransportErrorKind::Parse, format!("Invalid response: {e}"))
    } else if e.is_request() {
        TransportError::new(
            TransportErrorKind::Connection,
            format!("Request error: {e}"),
        )
    } else {
        TransportError::new(
            TransportErrorKind::Connection,
            format!("Network error: {e}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_detail() {
        let err = TransportError::http_status(502, r#"{"detail":"Upstream chat error: boom"}"#);
        assert_eq!(err.kind, TransportErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 502: Upstream chat error: boom");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_extracts_nested_error() {
        let err = TransportError::http_status(400, r#"{"error":{"message":"bad kb"}}"#);
        assert_eq!(err.to_string(), "HTTP 400: bad kb");
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = TransportError::http_status(500, "Internal Server Error");
        assert_eq!(err.message, "HTTP 500");
        assert_eq!(err.details.as_deref(), Some("Internal Server Error"));

        let err = TransportError::http_status(404, "");
        assert_eq!(err.message, "HTTP 404");
        assert_eq!(err.details, None);
    }
}
