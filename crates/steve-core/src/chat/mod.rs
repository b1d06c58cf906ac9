//! Chat turns: wire events, stream parsing, the transport ladder and the
//! HTTP client behind it.

mod accumulator;
mod client;
mod controller;
mod events;
mod sources;
mod sse;
mod transport;
mod view;

pub use accumulator::{AccumulatedResponse, Applied};
pub use client::{ChatClient, USER_AGENT};
pub use controller::{ChatController, Tier, TurnOutcome, TurnState, TurnStatus};
pub use events::{SourcesPayload, StreamEvent, TextPayload};
pub use sources::reconcile;
pub use sse::{Frame, FrameParser, ManualSseStream};
pub use transport::{
    ChatTransport, EventStream, TransportError, TransportErrorKind, TransportResult,
    classify_reqwest_error,
};
pub use view::{RecordingView, TurnView};
