//! One-shot question.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, bail};
use steve_core::chat::TurnStatus;
use steve_core::config::Config;
use steve_core::interrupt::InterruptedError;

use crate::cli::turn;
use crate::view::TerminalView;

pub async fn run(
    prompt: &str,
    kb: &[i64],
    top_k: Option<u32>,
    html: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("Prompt is empty");
    }
    let kb_ids = turn::resolve_kb_ids(kb, config)?;
    let request = turn::build_request(
        &kb_ids,
        Vec::new(),
        prompt,
        turn::resolve_top_k(top_k, config),
    )?;
    let mut controller = turn::controller(config)?;

    let mut stdout = io::stdout();
    let mut view = TerminalView::new(&mut stdout);
    let outcome = turn::run(&mut controller, &request, &mut view).await;
    view.finish(&outcome)?;

    if let Some(path) = html {
        fs::write(path, outcome.document.to_html())
            .with_context(|| format!("write HTML to {}", path.display()))?;
    }

    match outcome.status {
        TurnStatus::Succeeded => Ok(()),
        TurnStatus::Failed => bail!("Chat request failed"),
        TurnStatus::Cancelled => Err(InterruptedError.into()),
    }
}
