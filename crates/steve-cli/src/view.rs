//! Terminal rendering of a streaming turn.

use std::io::{self, Write};

use steve_core::chat::{TurnOutcome, TurnStatus, TurnView};
use steve_core::markdown::RenderedDocument;

/// Prints reply text as it grows.
///
/// Appends only the new suffix while the text extends what is already on
/// screen; when the text is replaced (an `error` event or the non-streaming
/// fallback) the whole reply is printed again on a fresh line.
///
/// The raw reply text is printed, not the rendered document: suffix appends
/// need the printed prefix to stay stable while markdown is still open.
pub struct TerminalView<'a, W: Write> {
    out: &'a mut W,
    shown: String,
    error: Option<io::Error>,
}

impl<'a, W: Write> TerminalView<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self {
            out,
            shown: String::new(),
            error: None,
        }
    }

    fn write_update(&mut self, text: &str) -> io::Result<()> {
        if let Some(suffix) = text.strip_prefix(self.shown.as_str()) {
            write!(self.out, "{suffix}")?;
        } else {
            writeln!(self.out)?;
            write!(self.out, "{text}")?;
        }
        self.out.flush()
    }

    /// Prints the turn footer (status and sources) and surfaces any write
    /// error hit while streaming.
    pub fn finish(self, outcome: &TurnOutcome) -> io::Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let out = self.out;
        if !outcome.text.ends_with('\n') {
            writeln!(out)?;
        }
        if outcome.status == TurnStatus::Cancelled {
            writeln!(out, "[interrupted]")?;
        }
        if !outcome.citations.is_empty() {
            writeln!(out, "Sources:")?;
            for (i, citation) in outcome.citations.iter().enumerate() {
                match citation.location() {
                    Some(location) => {
                        writeln!(out, "  [{}] {}  {location}", i + 1, citation.label())?;
                    }
                    None => writeln!(out, "  [{}] {}", i + 1, citation.label())?,
                }
            }
        }
        out.flush()
    }
}

impl<W: Write> TurnView for TerminalView<'_, W> {
    fn update(&mut self, text: &str, _document: &RenderedDocument) {
        if self.error.is_some() {
            return;
        }
        match self.write_update(text) {
            Ok(()) => text.clone_into(&mut self.shown),
            Err(e) => self.error = Some(e),
        }
    }
}
