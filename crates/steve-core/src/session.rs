//! Chat session store.
//!
//! All sessions live in one JSON document. The store is an explicit handle:
//! callers open it, pass it where needed, and every mutation is written
//! through to disk (when the store has a path).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use steve_types::{ChatMessage, Citation, Role};
use tracing::debug;

use crate::chat::{TurnOutcome, TurnStatus};

/// Title given to sessions created without one.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Prompts longer than this are truncated when used as a title.
const AUTO_TITLE_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Complete,
    Failed,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Citation>,
    #[serde(default)]
    pub status: MessageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    /// RFC 3339, UTC.
    pub created_at: String,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

impl ChatSession {
    fn has_default_title(&self) -> bool {
        let title = self.title.trim();
        title.is_empty() || title.eq_ignore_ascii_case(DEFAULT_TITLE)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    active: Option<String>,
    /// Newest first.
    #[serde(default)]
    sessions: Vec<ChatSession>,
}

/// Derives a title from the first prompt of a session.
pub fn auto_title(prompt: &str) -> String {
    let prompt = prompt.trim();
    let mut title: String = prompt.chars().take(AUTO_TITLE_CHARS).collect();
    if prompt.chars().count() > AUTO_TITLE_CHARS {
        title.push('…');
    }
    title
}

pub struct SessionStore {
    path: Option<PathBuf>,
    data: SessionFile,
}

impl SessionStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read sessions from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse sessions from {}", path.display()))?
        } else {
            SessionFile::default()
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: SessionFile::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All sessions, newest first.
    pub fn list(&self) -> &[ChatSession] {
        &self.data.sessions
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.data.sessions.iter().find(|s| s.id == id)
    }

    /// Finds a session by full id or unique id prefix.
    pub fn find(&self, id_or_prefix: &str) -> Result<&ChatSession> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            bail!("Session id must not be empty");
        }
        if let Some(session) = self.get(needle) {
            return Ok(session);
        }
        let mut matches = self.data.sessions.iter().filter(|s| s.id.starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(session), None) => Ok(session),
            (None, _) => bail!("No session matching '{needle}'"),
            (Some(_), Some(_)) => bail!("Session id '{needle}' is ambiguous"),
        }
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.data.active.as_deref().and_then(|id| self.get(id))
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            bail!("No session with id '{id}'");
        }
        self.data.active = Some(id.to_string());
        self.save()
    }

    /// Creates a session, makes it active and returns its id.
    pub fn create(&mut self, title: Option<&str>) -> Result<String> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let session = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            messages: Vec::new(),
        };
        let id = session.id.clone();
        self.data.sessions.insert(0, session);
        self.data.active = Some(id.clone());
        self.save()?;
        Ok(id)
    }

    /// Returns the active session id, creating a session if there is none.
    pub fn ensure_active(&mut self) -> Result<String> {
        match self.active() {
            Some(session) => Ok(session.id.clone()),
            None => self.create(None),
        }
    }

    pub fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Session title must not be empty");
        }
        self.session_mut(id)?.title = title.to_string();
        self.save()
    }

    /// Deletes a session. If it was active, the newest remaining session
    /// becomes active.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.data.sessions.len();
        self.data.sessions.retain(|s| s.id != id);
        if self.data.sessions.len() == before {
            bail!("No session with id '{id}'");
        }
        if self.data.active.as_deref() == Some(id) {
            self.data.active = self.data.sessions.first().map(|s| s.id.clone());
        }
        self.save()
    }

    /// Appends a finished turn: the prompt and the assistant's final text,
    /// citations and status. Failed and interrupted turns are kept.
    pub fn record_turn(&mut self, id: &str, prompt: &str, outcome: &TurnOutcome) -> Result<()> {
        let session = self.session_mut(id)?;
        if session.messages.is_empty() && session.has_default_title() {
            session.title = auto_title(prompt);
        }
        session.messages.push(SessionMessage {
            role: Role::User,
            content: prompt.to_string(),
            sources: Vec::new(),
            status: MessageStatus::Complete,
        });
        session.messages.push(SessionMessage {
            role: Role::Assistant,
            content: outcome.text.clone(),
            sources: outcome.citations.clone(),
            status: match outcome.status {
                TurnStatus::Succeeded => MessageStatus::Complete,
                TurnStatus::Failed => MessageStatus::Failed,
                TurnStatus::Cancelled => MessageStatus::Interrupted,
            },
        });
        self.save()
    }

    /// Prior turns to send with the next prompt: the last `limit` messages,
    /// skipping failed or interrupted answers and the prompts behind them.
    pub fn history(&self, id: &str, limit: usize) -> Vec<ChatMessage> {
        let Some(session) = self.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut pending: Option<&SessionMessage> = None;
        for message in &session.messages {
            match message.role {
                Role::User => {
                    if let Some(prev) = pending.replace(message) {
                        out.push(ChatMessage::user(prev.content.clone()));
                    }
                }
                Role::Assistant => {
                    let prompt = pending.take();
                    if message.status == MessageStatus::Complete {
                        if let Some(prompt) = prompt {
                            out.push(ChatMessage::user(prompt.content.clone()));
                        }
                        out.push(ChatMessage::assistant(message.content.clone()));
                    }
                }
                Role::System => {}
            }
        }
        let start = out.len().saturating_sub(limit);
        out.split_off(start)
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut ChatSession> {
        self.data
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .with_context(|| format!("No session with id '{id}'"))
    }

    /// Writes the store atomically (temp file + rename).
    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize sessions")?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write sessions to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        debug!(path = %path.display(), sessions = self.data.sessions.len(), "saved sessions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::chat::Tier;
    use crate::markdown;

    fn outcome(text: &str, status: TurnStatus) -> TurnOutcome {
        TurnOutcome {
            text: text.to_string(),
            document: markdown::render(text),
            citations: Vec::new(),
            tier: Some(Tier::EventSource),
            status,
        }
    }

    #[test]
    fn test_create_makes_newest_active() {
        let mut store = SessionStore::in_memory();
        let first = store.create(None).unwrap();
        let second = store.create(Some("  Research  ")).unwrap();

        assert_eq!(store.list()[0].id, second);
        assert_eq!(store.list()[0].title, "Research");
        assert_eq!(store.list()[1].title, DEFAULT_TITLE);
        assert_eq!(store.active().unwrap().id, second);

        store.set_active(&first).unwrap();
        assert_eq!(store.active().unwrap().id, first);
        assert!(store.set_active("missing").is_err());
    }

    #[test]
    fn test_auto_title_on_first_turn() {
        let mut store = SessionStore::in_memory();
        let id = store.create(None).unwrap();
        let prompt = "What does the onboarding guide say about laptops and VPN access?";
        store
            .record_turn(&id, prompt, &outcome("answer", TurnStatus::Succeeded))
            .unwrap();

        let title = store.get(&id).unwrap().title.clone();
        assert_eq!(title.chars().count(), 49);
        assert!(title.ends_with('…'));

        store
            .record_turn(&id, "second question", &outcome("b", TurnStatus::Succeeded))
            .unwrap();
        assert_eq!(store.get(&id).unwrap().title, title);
    }

    #[test]
    fn test_custom_title_not_replaced() {
        let mut store = SessionStore::in_memory();
        let id = store.create(Some("Mine")).unwrap();
        store
            .record_turn(&id, "short", &outcome("a", TurnStatus::Succeeded))
            .unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Mine");
        assert_eq!(auto_title("short"), "short");
    }

    #[test]
    fn test_failed_turns_recorded_but_not_replayed() {
        let mut store = SessionStore::in_memory();
        let id = store.create(None).unwrap();
        store
            .record_turn(&id, "q1", &outcome("a1", TurnStatus::Succeeded))
            .unwrap();
        store
            .record_turn(&id, "q2", &outcome("Error: HTTP 502", TurnStatus::Failed))
            .unwrap();
        store
            .record_turn(&id, "q3", &outcome("partial", TurnStatus::Cancelled))
            .unwrap();
        store
            .record_turn(&id, "q4", &outcome("a4", TurnStatus::Succeeded))
            .unwrap();

        let session = store.get(&id).unwrap();
        assert_eq!(session.messages.len(), 8);
        assert_eq!(session.messages[3].status, MessageStatus::Failed);
        assert_eq!(session.messages[5].status, MessageStatus::Interrupted);

        let history = store.history(&id, 20);
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["q1", "a1", "q4", "a4"]);

        let last_two = store.history(&id, 2);
        assert_eq!(last_two[0], ChatMessage::user("q4"));
        assert_eq!(last_two[1], ChatMessage::assistant("a4"));
        assert!(store.history(&id, 0).is_empty());
        assert!(store.history("missing", 5).is_empty());
    }

    #[test]
    fn test_rename_and_delete() {
        let mut store = SessionStore::in_memory();
        let a = store.create(Some("a")).unwrap();
        let b = store.create(Some("b")).unwrap();

        store.rename(&a, " renamed ").unwrap();
        assert_eq!(store.get(&a).unwrap().title, "renamed");
        assert!(store.rename(&a, "   ").is_err());

        store.delete(&b).unwrap();
        assert_eq!(store.active().unwrap().id, a);
        store.delete(&a).unwrap();
        assert!(store.active().is_none());
        assert!(store.delete(&a).is_err());
    }

    #[test]
    fn test_find_by_prefix() {
        let mut store = SessionStore::in_memory();
        let id = store.create(None).unwrap();
        assert_eq!(store.find(&id).unwrap().id, id);
        assert_eq!(store.find(&id[..8]).unwrap().id, id);
        assert!(store.find("zzzz").is_err());
        assert!(store.find("").is_err());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("sessions.json");

        let mut store = SessionStore::open(&path).unwrap();
        let id = store.create(None).unwrap();
        store
            .record_turn(&id, "hello", &outcome("hi", TurnStatus::Succeeded))
            .unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.active().unwrap().id, id);
        assert_eq!(reopened.get(&id).unwrap().messages.len(), 2);
        assert_eq!(reopened.get(&id).unwrap().title, "hello");
    }

    #[test]
    fn test_open_corrupt_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{not json").unwrap();
        let err = SessionStore::open(&path).err().unwrap();
        assert!(format!("{err:#}").contains("Failed to parse sessions"));
    }
}
