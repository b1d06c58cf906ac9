//! Folds stream events into the response for one turn.

use steve_types::Citation;

use crate::chat::events::{SourcesPayload, StreamEvent};

/// Response state for the in-flight turn.
///
/// Tokens only ever append. An `error` event replaces the text with the
/// error message and marks the turn failed. Citations are captured once, from
/// the first well-formed `sources` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedResponse {
    text: String,
    citations: Option<Vec<Citation>>,
    failed: bool,
}

/// What applying an event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Text grew or was replaced; the view must be refreshed.
    Text,
    /// Citations were captured or the event was ignored.
    Quiet,
}

impl AccumulatedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: StreamEvent) -> Applied {
        match event {
            StreamEvent::Token(payload) => {
                self.text.push_str(payload.as_str());
                Applied::Text
            }
            StreamEvent::Error(payload) => {
                self.text = payload.into_string();
                self.failed = true;
                Applied::Text
            }
            StreamEvent::Sources(SourcesPayload::Citations(citations)) => {
                if self.citations.is_none() {
                    self.citations = Some(citations);
                }
                Applied::Quiet
            }
            StreamEvent::Sources(SourcesPayload::Malformed(_)) => Applied::Quiet,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn citations(&self) -> Option<&[Citation]> {
        self.citations.as_deref()
    }

    /// True once an `error` event has been received.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Clears everything for a new turn.
    pub fn reset(&mut self) {
        self.text.clear();
        self.citations = None;
        self.failed = false;
    }
}
