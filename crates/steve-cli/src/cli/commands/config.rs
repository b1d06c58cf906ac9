//! Config command handlers.

use anyhow::{Context, Result};
use steve_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set_top_k(top_k: u32) -> Result<()> {
    config::Config::save_top_k(top_k)?;
    println!(
        "Saved top_k = {top_k} to {}",
        config::paths::config_path().display()
    );
    Ok(())
}
