//! Interactive chat.
//!
//! A line-oriented REPL: every non-empty line runs one turn, `:q` quits.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use steve_core::chat::{ChatClient, ChatController};
use steve_core::config::{Config, paths};
use steve_core::session::SessionStore;

use crate::cli::turn;
use crate::view::TerminalView;

const QUIT_COMMAND: &str = ":q";
const PROMPT_PREFIX: &str = "you> ";

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub kb: Vec<i64>,
    pub top_k: Option<u32>,
    pub session: Option<String>,
    pub new: bool,
    pub no_save: bool,
}

/// Everything a running chat needs between turns.
pub struct ChatContext {
    pub controller: ChatController<ChatClient>,
    pub store: SessionStore,
    pub session_id: String,
    pub kb_ids: Vec<i64>,
    pub top_k: u32,
    pub history_limit: usize,
}

pub async fn run(options: &ChatOptions, config: &Config) -> Result<()> {
    let kb_ids = turn::resolve_kb_ids(&options.kb, config)?;
    let top_k = turn::resolve_top_k(options.top_k, config);

    let mut store = if options.no_save {
        SessionStore::in_memory()
    } else {
        let path = paths::sessions_path();
        SessionStore::open(&path)
            .with_context(|| format!("open sessions at {}", path.display()))?
    };
    let session_id = select_session(&mut store, options)?;

    let mut chat = ChatContext {
        controller: turn::controller(config)?,
        store,
        session_id,
        kb_ids,
        top_k,
        history_limit: config.history_limit,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_chat(stdin.lock(), &mut stdout, &mut chat).await
}

fn select_session(store: &mut SessionStore, options: &ChatOptions) -> Result<String> {
    if options.new {
        return store.create(None);
    }
    if let Some(wanted) = options.session.as_deref() {
        let id = store.find(wanted)?.id.clone();
        store.set_active(&id)?;
        return Ok(id);
    }
    store.ensure_active()
}

/// Runs the chat loop until `:q` or end of input.
pub async fn run_chat<R, W>(input: R, output: &mut W, chat: &mut ChatContext) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let title = chat
        .store
        .get(&chat.session_id)
        .map_or_else(String::new, |s| s.title.clone());
    writeln!(output, "Steve Chat [{title}] (:q to quit)")?;
    write!(output, "{PROMPT_PREFIX}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed == QUIT_COMMAND {
            writeln!(output, "Goodbye!")?;
            break;
        }

        if trimmed.is_empty() {
            write!(output, "{PROMPT_PREFIX}")?;
            output.flush()?;
            continue;
        }

        let history = chat.store.history(&chat.session_id, chat.history_limit);
        let request = turn::build_request(&chat.kb_ids, history, trimmed, chat.top_k)?;

        let mut view = TerminalView::new(output);
        let outcome = turn::run(&mut chat.controller, &request, &mut view).await;
        view.finish(&outcome)?;

        if let Err(e) = chat.store.record_turn(&chat.session_id, trimmed, &outcome) {
            writeln!(output, "Warning: Failed to save session: {e:#}")?;
        }

        write!(output, "{PROMPT_PREFIX}")?;
        output.flush()?;
    }

    Ok(())
}
