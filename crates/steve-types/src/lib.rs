//! Wire types shared by the steve chat client.
//!
//! These mirror the JSON contract of the remote chat service: the request
//! body sent to `/chat` and `/chat/stream`, the single-shot reply, and the
//! citation records attached to replies, plus the health probe.

pub mod citation;
pub mod health;
pub mod request;

pub use citation::{Citation, CitationKey, CitationLink, DocumentId};
pub use health::{HealthStatus, ModelServer};
pub use request::{ChatMessage, ChatReply, ChatRequest, RequestError, Role};
