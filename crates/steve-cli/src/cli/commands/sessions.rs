//! Session command handlers.

use anyhow::{Context, Result};
use steve_core::config::paths;
use steve_core::session::{MessageStatus, SessionStore};
use steve_types::Role;

fn open_store() -> Result<SessionStore> {
    let path = paths::sessions_path();
    SessionStore::open(&path).with_context(|| format!("open sessions at {}", path.display()))
}

pub fn list() -> Result<()> {
    let store = open_store()?;
    if store.list().is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    let active = store.active().map(|s| s.id.clone());
    for session in store.list() {
        let marker = if active.as_deref() == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  {}  ({} messages)",
            session.id,
            session.title,
            session.created_at,
            session.messages.len()
        );
    }
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let store = open_store()?;
    let session = store.find(id)?;
    println!("# {}", session.title);
    for message in &session.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "steve",
            Role::System => "system",
        };
        let status = match message.status {
            MessageStatus::Complete => "",
            MessageStatus::Failed => " [failed]",
            MessageStatus::Interrupted => " [interrupted]",
        };
        println!("\n{who}>{status} {}", message.content);
        for citation in &message.sources {
            println!("  - {}", citation.label());
        }
    }
    Ok(())
}

pub fn rename(id: &str, title: &str) -> Result<()> {
    let mut store = open_store()?;
    let id = store.find(id)?.id.clone();
    store
        .rename(&id, title)
        .with_context(|| format!("rename session '{id}'"))?;
    println!("Renamed session {id} → {}", title.trim());
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let mut store = open_store()?;
    let id = store.find(id)?.id.clone();
    store
        .delete(&id)
        .with_context(|| format!("delete session '{id}'"))?;
    println!("Deleted session {id}");
    Ok(())
}
