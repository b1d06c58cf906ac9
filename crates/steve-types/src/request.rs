//! Chat request and reply bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::citation::Citation;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prior turn (or the new prompt) sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reasons a [`ChatRequest`] cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// No knowledgebase was selected.
    NoKnowledgebases,
    /// The context size must be at least 1.
    ZeroTopK,
    /// There is nothing to answer.
    NoMessages,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NoKnowledgebases => write!(f, "Select at least one knowledgebase"),
            RequestError::ZeroTopK => write!(f, "Context size (top_k) must be at least 1"),
            RequestError::NoMessages => write!(f, "A chat request needs at least one message"),
        }
    }
}

impl std::error::Error for RequestError {}

/// Body of `POST /chat` and `POST /chat/stream`.
///
/// Immutable once built: fields are private and only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    kb_ids: Vec<i64>,
    messages: Vec<ChatMessage>,
    top_k: u32,
}

impl ChatRequest {
    /// Builds a validated request.
    ///
    /// Duplicate knowledgebase ids are dropped, keeping first-seen order.
    ///
    /// # Errors
    /// Returns an error if no knowledgebase is selected, `top_k` is zero, or
    /// `messages` is empty.
    pub fn new(
        kb_ids: impl IntoIterator<Item = i64>,
        messages: Vec<ChatMessage>,
        top_k: u32,
    ) -> Result<Self, RequestError> {
        let mut ids: Vec<i64> = Vec::new();
        for id in kb_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(RequestError::NoKnowledgebases);
        }
        if top_k == 0 {
            return Err(RequestError::ZeroTopK);
        }
        if messages.is_empty() {
            return Err(RequestError::NoMessages);
        }
        Ok(Self {
            kb_ids: ids,
            messages,
            top_k,
        })
    }

    pub fn kb_ids(&self) -> &[i64] {
        &self.kb_ids
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    /// The prompt being answered (the last message).
    pub fn prompt(&self) -> &str {
        self.messages.last().map_or("", |m| m.content.as_str())
    }
}

/// Body of a `POST /chat` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: String,
    /// `None` when the service omitted the field entirely.
    #[serde(default)]
    pub sources: Option<Vec<Citation>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_service_shape() {
        let request = ChatRequest::new([1, 2], vec![ChatMessage::user("hi")], 5).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kb_ids": [1, 2],
                "messages": [{"role": "user", "content": "hi"}],
                "top_k": 5
            })
        );
    }

    #[test]
    fn test_request_rejects_invalid_input() {
        let msgs = || vec![ChatMessage::user("q")];
        assert_eq!(
            ChatRequest::new([], msgs(), 5),
            Err(RequestError::NoKnowledgebases)
        );
        assert_eq!(ChatRequest::new([1], msgs(), 0), Err(RequestError::ZeroTopK));
        assert_eq!(
            ChatRequest::new([1], Vec::new(), 3),
            Err(RequestError::NoMessages)
        );
    }

    #[test]
    fn test_request_dedupes_kb_ids() {
        let request = ChatRequest::new([3, 1, 3, 2, 1], vec![ChatMessage::user("q")], 5).unwrap();
        assert_eq!(request.kb_ids(), &[3, 1, 2]);
        assert_eq!(request.prompt(), "q");
    }

    #[test]
    fn test_reply_tolerates_missing_sources() {
        let reply: ChatReply = serde_json::from_str(r#"{"reply":"ok"}"#).unwrap();
        assert_eq!(reply.reply, "ok");
        assert!(reply.sources.is_none());

        let reply: ChatReply =
            serde_json::from_str(r#"{"reply":"ok","sources":[{"document_id":4}]}"#).unwrap();
        assert_eq!(reply.sources.map(|s| s.len()), Some(1));
    }
}
