//! Service health check.

use anyhow::{Context, Result, bail};
use steve_core::chat::ChatClient;
use steve_core::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let client = ChatClient::from_config(config)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("reach {}", client.base_url()))?;

    println!("Service: {} ({})", health.status, client.base_url());
    if let Some(lm) = &health.lm {
        let show = |value: Option<&String>| value.map_or("-", String::as_str).to_string();
        println!("Model server: {}", show(lm.base_url.as_ref()));
        println!("Embedding model: {}", show(lm.embedding_model.as_ref()));
        println!("Chat model: {}", show(lm.chat_model.as_ref()));
    }

    if !health.is_ok() {
        bail!("Service reported status '{}'", health.status);
    }
    Ok(())
}
