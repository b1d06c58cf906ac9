//! Citation records attached to chat replies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of characters shown from a cited passage.
pub const SNIPPET_CHARS: usize = 500;

/// Document identifier as sent by the service (usually an integer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    Text(String),
}

impl DocumentId {
    fn is_empty(&self) -> bool {
        matches!(self, DocumentId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(id) => write!(f, "{id}"),
            DocumentId::Text(id) => f.write_str(id),
        }
    }
}

/// Stable identity of a citation, used for deduplication.
///
/// Document ids and textual keys are separate key spaces; source path and
/// title share the textual one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CitationKey {
    Document(DocumentId),
    Text(String),
}

/// Where a citation points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationLink {
    Url(String),
    Path(String),
}

/// One record backing part of a reply. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl Citation {
    /// Identity key: document id, else source path, else title.
    ///
    /// Returns `None` for records with no identity; those are dropped by the
    /// reconciler.
    pub fn key(&self) -> Option<CitationKey> {
        if let Some(id) = self.document_id.as_ref().filter(|id| !id.is_empty()) {
            return Some(CitationKey::Document(id.clone()));
        }
        non_empty(self.source.as_ref())
            .or_else(|| non_empty(self.title.as_ref()))
            .map(|s| CitationKey::Text(s.to_string()))
    }

    pub fn display_title(&self) -> &str {
        non_empty(self.title.as_ref())
            .or_else(|| non_empty(self.source.as_ref()))
            .unwrap_or("Untitled")
    }

    /// File path, else source.
    pub fn location(&self) -> Option<&str> {
        non_empty(self.file_path.as_ref()).or_else(|| non_empty(self.source.as_ref()))
    }

    pub fn link(&self) -> Option<CitationLink> {
        let location = self.location()?;
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(CitationLink::Url(location.to_string()))
        } else {
            Some(CitationLink::Path(location.to_string()))
        }
    }

    /// First [`SNIPPET_CHARS`] characters of the cited passage.
    pub fn snippet(&self) -> Option<String> {
        let text = non_empty(self.text.as_ref())?;
        Some(text.chars().take(SNIPPET_CHARS).collect())
    }

    /// `"<title> (KB #<kb> · Doc <id>)"`, omitting the parts that are absent.
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kb) = self.kb_id {
            parts.push(format!("KB #{kb}"));
        }
        if let Some(id) = self.document_id.as_ref().filter(|id| !id.is_empty()) {
            parts.push(format!("Doc {id}"));
        }
        if parts.is_empty() {
            self.display_title().to_string()
        } else {
            format!("{} ({})", self.display_title(), parts.join(" · "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(json: &str) -> Citation {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_key_prefers_document_id() {
        let c = citation(r#"{"document_id": 7, "source": "a.pdf", "title": "A"}"#);
        assert_eq!(c.key(), Some(CitationKey::Document(DocumentId::Int(7))));
    }

    #[test]
    fn test_key_falls_back_to_source_then_title() {
        let c = citation(r#"{"source": "a.pdf", "title": "A"}"#);
        assert_eq!(c.key(), Some(CitationKey::Text("a.pdf".into())));

        let c = citation(r#"{"source": "", "title": "A"}"#);
        assert_eq!(c.key(), Some(CitationKey::Text("A".into())));

        let c = citation(r#"{"kb_id": 1, "text": "orphan"}"#);
        assert_eq!(c.key(), None);
    }

    #[test]
    fn test_string_document_id() {
        let c = citation(r#"{"document_id": "doc-9"}"#);
        assert_eq!(
            c.key(),
            Some(CitationKey::Document(DocumentId::Text("doc-9".into())))
        );
    }

    #[test]
    fn test_label_and_title() {
        let c = citation(r#"{"document_id": 3, "kb_id": 2, "title": "Guide"}"#);
        assert_eq!(c.label(), "Guide (KB #2 · Doc 3)");

        let c = citation(r#"{"source": "notes.md"}"#);
        assert_eq!(c.display_title(), "notes.md");
        assert_eq!(c.label(), "notes.md");

        assert_eq!(Citation::default().display_title(), "Untitled");
    }

    #[test]
    fn test_link_classification() {
        let c = citation(r#"{"source": "https://example.com/a"}"#);
        assert_eq!(
            c.link(),
            Some(CitationLink::Url("https://example.com/a".into()))
        );

        let c = citation(r#"{"source": "https://example.com/a", "file_path": "/data/a.pdf"}"#);
        assert_eq!(c.link(), Some(CitationLink::Path("/data/a.pdf".into())));
        assert_eq!(Citation::default().link(), None);
    }

    #[test]
    fn test_snippet_truncates_by_chars() {
        let c = Citation {
            text: Some("é".repeat(600)),
            ..Citation::default()
        };
        assert_eq!(c.snippet().unwrap().chars().count(), SNIPPET_CHARS);
    }
}
