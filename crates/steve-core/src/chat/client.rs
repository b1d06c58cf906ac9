//! HTTP transport for the chat service.

use std::time::Duration;

use anyhow::{Context, Result};
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{StreamExt, future};
use steve_types::{ChatReply, ChatRequest, HealthStatus};
use tracing::debug;

use crate::chat::events::StreamEvent;
use crate::chat::sse::ManualSseStream;
use crate::chat::transport::{
    ChatTransport, EventStream, TransportError, TransportErrorKind, TransportResult,
    classify_reqwest_error,
};
use crate::config::{Config, TransportConfig};

pub const USER_AGENT: &str = concat!("steve/", env!("CARGO_PKG_VERSION"));

/// Talks to `/chat/stream`, `/chat` and `/health`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    http: reqwest::Client,
    event_source: bool,
    manual_stream: bool,
    request_timeout: Option<Duration>,
}

impl ChatClient {
    /// Builds a client for `base_url` with default transport settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_transport(base_url.into(), &TransportConfig::default())
    }

    /// Builds a client from the resolved config (API URL and `[transport]`).
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_transport(config.api_url()?, &config.transport)
    }

    fn with_transport(base_url: String, transport: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = transport.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            event_source: transport.event_source,
            manual_stream: transport.manual_stream,
            request_timeout: transport.request_timeout(),
        })
    }

    /// Enables or disables the two streaming tiers.
    #[must_use]
    pub fn with_tiers(mut self, event_source: bool, manual_stream: bool) -> Self {
        self.event_source = event_source;
        self.manual_stream = manual_stream;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /health`.
    pub async fn health(&self) -> TransportResult<HealthStatus> {
        let response = self
            .http
            .get(self.endpoint("/health"))
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            TransportError::new(TransportErrorKind::Parse, format!("Invalid health reply: {e}"))
                .with_details(body)
        })
    }

    async fn post_stream(&self, request: &ChatRequest) -> TransportResult<reqwest::Response> {
        debug!(
            kbs = request.kb_ids().len(),
            messages = request.messages().len(),
            top_k = request.top_k(),
            "POST /chat/stream"
        );
        let response = self
            .http
            .post(self.endpoint("/chat/stream"))
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::http_status(status.as_u16(), &body));
        }
        Ok(response)
    }
}

async fn read_success_body(response: reqwest::Response) -> TransportResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(TransportError::http_status(status.as_u16(), &body))
    }
}

fn map_eventsource_error<E: std::fmt::Display>(e: &EventStreamError<E>) -> TransportError {
    match e {
        EventStreamError::Transport(inner) => TransportError::new(
            TransportErrorKind::Connection,
            format!("Stream read failed: {inner}"),
        ),
        other => TransportError::new(
            TransportErrorKind::Parse,
            format!("Malformed event stream: {other}"),
        ),
    }
}

impl ChatTransport for ChatClient {
    async fn open_event_source(&self, request: &ChatRequest) -> TransportResult<EventStream> {
        if !self.event_source {
            return Err(TransportError::unavailable("Event-stream client disabled"));
        }
        let response = self.post_stream(request).await?;
        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|item| {
                future::ready(match item {
                    Ok(event) => StreamEvent::from_frame(&event.event, &event.data).map(Ok),
                    Err(e) => Some(Err(map_eventsource_error(&e))),
                })
            });
        Ok(events.boxed())
    }

    async fn open_manual_stream(&self, request: &ChatRequest) -> TransportResult<EventStream> {
        if !self.manual_stream {
            return Err(TransportError::unavailable("Manual stream disabled"));
        }
        let response = self.post_stream(request).await?;
        Ok(ManualSseStream::new(response.bytes_stream().boxed()).boxed())
    }

    async fn send_sync(&self, request: &ChatRequest) -> TransportResult<ChatReply> {
        debug!("POST /chat");
        let mut builder = self
            .http
            .post(self.endpoint("/chat"))
            .header("accept", "application/json")
            .json(request);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            TransportError::new(TransportErrorKind::Parse, format!("Invalid chat reply: {e}"))
                .with_details(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChatClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint("/chat"), "http://localhost:8000/chat");
    }

    #[tokio::test]
    async fn test_disabled_tiers_are_unavailable() {
        let client = ChatClient::new("http://localhost:1")
            .unwrap()
            .with_tiers(false, false);
        let request =
            ChatRequest::new([1], vec![steve_types::ChatMessage::user("q")], 5).unwrap();

        let Err(err) = client.open_event_source(&request).await else {
            panic!("expected unavailable");
        };
        assert_eq!(err.kind, TransportErrorKind::Unavailable);
        let Err(err) = client.open_manual_stream(&request).await else {
            panic!("expected unavailable");
        };
        assert_eq!(err.kind, TransportErrorKind::Unavailable);
    }
}
