//! Markdown to HTML.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use steve_core::markdown;

pub fn run(file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut text)
                .context("read stdin")?;
            text
        }
    };
    println!("{}", markdown::render(&text).to_html());
    Ok(())
}
