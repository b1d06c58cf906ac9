//! Transport fallback state machine.
//!
//! A turn walks at most three tiers, strictly one after another:
//!
//! 1. event-stream client
//! 2. manually parsed streaming request, when tier 1 is unavailable or fails
//!    before any text arrives
//! 3. single non-streaming request, when tier 2 is unavailable or fails, when
//!    a stream reported an error, or when the streamed reply renders blank
//!
//! Exactly one tier produces the final value. Tier 3 overwrites whatever was
//! shown. Every await races the turn's cancellation token.

use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use steve_types::{ChatRequest, Citation};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::accumulator::{AccumulatedResponse, Applied};
use crate::chat::events::StreamEvent;
use crate::chat::sources::reconcile;
use crate::chat::transport::{ChatTransport, EventStream, TransportError, TransportResult};
use crate::chat::view::TurnView;
use crate::markdown::{self, RenderedDocument};

/// One strategy in the fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    EventSource,
    ManualStream,
    Sync,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::EventSource => write!(f, "event-source"),
            Tier::ManualStream => write!(f, "manual-stream"),
            Tier::Sync => write!(f, "sync"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Tier1Streaming,
    Tier2ManualStreaming,
    Tier3Sync,
    Succeeded(Tier),
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Succeeded,
    /// Tier 3 failed; the text is `"Error: <message>"`.
    Failed,
    Cancelled,
}

/// Final result of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub document: RenderedDocument,
    /// Deduplicated, in first-seen order.
    pub citations: Vec<Citation>,
    /// The tier that produced the value (or was running when cancelled).
    pub tier: Option<Tier>,
    pub status: TurnStatus,
}

impl TurnOutcome {
    fn new(text: String, citations: &[Citation], tier: Tier, status: TurnStatus) -> Self {
        Self {
            document: markdown::render(&text),
            text,
            citations: reconcile(citations),
            tier: Some(tier),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TurnStatus::Succeeded
    }
}

enum StreamEnd {
    Completed,
    Failed(TransportError),
    Cancelled,
}

/// Runs chat turns over a [`ChatTransport`].
pub struct ChatController<T> {
    transport: T,
    chunk_timeout: Option<Duration>,
    state: TurnState,
    current: Option<CancellationToken>,
}

impl<T: ChatTransport> ChatController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_timeout: None,
            state: TurnState::Idle,
            current: None,
        }
    }

    /// Caps the wait for any single stream event. A stalled stream becomes a
    /// `Timeout` failure of that tier.
    #[must_use]
    pub fn with_chunk_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Starts a new turn, cancelling the previous one if it is still live.
    pub fn begin_turn(&mut self) -> CancellationToken {
        if let Some(previous) = self.current.take()
            && !previous.is_cancelled()
        {
            debug!("cancelling superseded turn");
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        self.state = TurnState::Idle;
        token
    }

    /// Runs one turn to completion, updating `view` as content arrives.
    pub async fn run_turn(
        &mut self,
        request: &ChatRequest,
        view: &mut impl TurnView,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let mut acc = AccumulatedResponse::new();

        self.state = TurnState::Tier1Streaming;
        let tier1 = self
            .stream_tier(Tier::EventSource, request, &mut acc, view, cancel)
            .await;
        let try_manual = match tier1 {
            StreamEnd::Cancelled => return self.cancelled(&acc, Tier::EventSource),
            StreamEnd::Completed if !acc.failed() && has_content(&acc) => {
                return self.succeeded(&acc, Tier::EventSource);
            }
            StreamEnd::Completed => {
                debug!(failed = acc.failed(), "event stream ended without a usable reply");
                false
            }
            StreamEnd::Failed(e) if acc.text().is_empty() => {
                info!(kind = %e.kind, error = %e, "event stream failed, trying manual stream");
                true
            }
            StreamEnd::Failed(e) => {
                warn!(kind = %e.kind, error = %e, "event stream failed mid-reply");
                false
            }
        };

        if try_manual {
            acc.reset();
            self.state = TurnState::Tier2ManualStreaming;
            match self
                .stream_tier(Tier::ManualStream, request, &mut acc, view, cancel)
                .await
            {
                StreamEnd::Cancelled => return self.cancelled(&acc, Tier::ManualStream),
                StreamEnd::Completed if !acc.failed() && has_content(&acc) => {
                    return self.succeeded(&acc, Tier::ManualStream);
                }
                StreamEnd::Completed => {
                    debug!(failed = acc.failed(), "manual stream ended without a usable reply");
                }
                StreamEnd::Failed(e) => {
                    info!(kind = %e.kind, error = %e, "manual stream failed");
                }
            }
        }

        self.state = TurnState::Tier3Sync;
        info!("falling back to non-streaming request");
        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => return self.cancelled(&acc, Tier::Sync),
            reply = self.transport.send_sync(request) => reply,
        };

        let outcome = match reply {
            Ok(reply) => {
                let citations = reply
                    .sources
                    .or_else(|| acc.citations().map(<[Citation]>::to_vec))
                    .unwrap_or_default();
                self.state = TurnState::Succeeded(Tier::Sync);
                TurnOutcome::new(reply.reply, &citations, Tier::Sync, TurnStatus::Succeeded)
            }
            Err(e) => {
                warn!(kind = %e.kind, error = %e, "non-streaming request failed");
                self.state = TurnState::Failed;
                TurnOutcome::new(
                    format!("Error: {}", e.message),
                    &[],
                    Tier::Sync,
                    TurnStatus::Failed,
                )
            }
        };
        view.update(&outcome.text, &outcome.document);
        outcome
    }

    async fn open_stream(&self, tier: Tier, request: &ChatRequest) -> TransportResult<EventStream> {
        match tier {
            Tier::EventSource => self.transport.open_event_source(request).await,
            Tier::ManualStream => self.transport.open_manual_stream(request).await,
            Tier::Sync => Err(TransportError::unavailable("sync tier does not stream")),
        }
    }

    async fn stream_tier(
        &self,
        tier: Tier,
        request: &ChatRequest,
        acc: &mut AccumulatedResponse,
        view: &mut impl TurnView,
        cancel: &CancellationToken,
    ) -> StreamEnd {
        debug!(%tier, "opening stream");
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamEnd::Cancelled,
            opened = self.open_stream(tier, request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return StreamEnd::Failed(e),
        };

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return StreamEnd::Cancelled,
                next = next_event(&mut stream, self.chunk_timeout) => next,
            };
            match next {
                Ok(Some(event)) => {
                    if acc.apply(event) == Applied::Text {
                        let document = markdown::render(acc.text());
                        view.update(acc.text(), &document);
                    }
                }
                Ok(None) => return StreamEnd::Completed,
                Err(e) => return StreamEnd::Failed(e),
            }
        }
    }

    fn succeeded(&mut self, acc: &AccumulatedResponse, tier: Tier) -> TurnOutcome {
        debug!(%tier, chars = acc.text().len(), "turn complete");
        self.state = TurnState::Succeeded(tier);
        TurnOutcome::new(
            acc.text().to_string(),
            acc.citations().unwrap_or_default(),
            tier,
            TurnStatus::Succeeded,
        )
    }

    fn cancelled(&mut self, acc: &AccumulatedResponse, tier: Tier) -> TurnOutcome {
        info!(%tier, "turn cancelled");
        self.state = TurnState::Cancelled;
        TurnOutcome::new(
            acc.text().to_string(),
            acc.citations().unwrap_or_default(),
            tier,
            TurnStatus::Cancelled,
        )
    }
}

/// True when the accumulated text renders to something visible.
fn has_content(acc: &AccumulatedResponse) -> bool {
    !markdown::render(acc.text()).is_blank()
}

async fn next_event(
    stream: &mut EventStream,
    timeout: Option<Duration>,
) -> TransportResult<Option<StreamEvent>> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(item) => item.transpose(),
            Err(_) => Err(TransportError::timeout(format!(
                "No stream data for {}s",
                limit.as_secs()
            ))),
        },
        None => stream.next().await.transpose(),
    }
}
