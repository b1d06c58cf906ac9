//! Turn view seam between the controller and whatever displays a reply.

use crate::markdown::RenderedDocument;

/// Receives the visible state of a turn as it changes.
///
/// Called synchronously after every `token` and `error` event and once more
/// when the non-streaming fallback overwrites the reply.
pub trait TurnView {
    fn update(&mut self, text: &str, document: &RenderedDocument);
}

/// Keeps every update; used in tests and for headless runs.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub texts: Vec<String>,
    pub last_document: RenderedDocument,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.texts.last().map(String::as_str)
    }
}

impl TurnView for RecordingView {
    fn update(&mut self, text: &str, document: &RenderedDocument) {
        self.texts.push(text.to_string());
        self.last_document = document.clone();
    }
}
