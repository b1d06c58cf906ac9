//! Shared turn plumbing for `chat` and `ask`.

use anyhow::{Result, bail};
use steve_core::chat::{ChatClient, ChatController, TurnOutcome, TurnView};
use steve_core::config::Config;
use steve_core::interrupt;
use steve_types::{ChatMessage, ChatRequest, RequestError};
use tracing::debug;

/// `--kb` wins over the configured default list.
pub fn resolve_kb_ids(cli: &[i64], config: &Config) -> Result<Vec<i64>> {
    let ids = if cli.is_empty() {
        config.knowledgebases.clone()
    } else {
        cli.to_vec()
    };
    if ids.is_empty() {
        bail!(RequestError::NoKnowledgebases);
    }
    Ok(ids)
}

/// `--top-k` wins over the config; zero is clamped to one.
pub fn resolve_top_k(cli: Option<u32>, config: &Config) -> u32 {
    cli.unwrap_or_else(|| config.effective_top_k()).max(1)
}

pub fn controller(config: &Config) -> Result<ChatController<ChatClient>> {
    let client = ChatClient::from_config(config)?;
    debug!(base_url = client.base_url(), "chat client ready");
    Ok(ChatController::new(client).with_chunk_timeout(config.transport.chunk_timeout()))
}

pub fn build_request(
    kb_ids: &[i64],
    mut history: Vec<ChatMessage>,
    prompt: &str,
    top_k: u32,
) -> Result<ChatRequest> {
    history.push(ChatMessage::user(prompt));
    Ok(ChatRequest::new(kb_ids.iter().copied(), history, top_k)?)
}

/// Runs one turn with Ctrl+C wired to its cancellation token.
pub async fn run(
    controller: &mut ChatController<ChatClient>,
    request: &ChatRequest,
    view: &mut impl TurnView,
) -> TurnOutcome {
    interrupt::reset();
    let token = controller.begin_turn();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = interrupt::wait_for_interrupt() => token.cancel(),
                () = token.cancelled() => {}
            }
        })
    };

    let outcome = controller.run_turn(request, view, &token).await;
    watcher.abort();
    interrupt::reset();
    outcome
}
