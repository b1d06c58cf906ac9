//! Configuration loading and on-disk paths.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Service address used when neither `STEVE_API_URL` nor `api_url` is set.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the service address.
pub const API_URL_ENV: &str = "STEVE_API_URL";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments and keys from the template are always present; the user's
/// values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for steve configuration and data.
    //!
    //! STEVE_HOME resolution order:
    //! 1. STEVE_HOME environment variable (if set)
    //! 2. ~/.config/steve (default)

    use std::path::PathBuf;

    /// Returns the steve home directory.
    pub fn steve_home() -> PathBuf {
        if let Ok(home) = std::env::var("STEVE_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".steve"),
            |h| h.join(".config").join("steve"),
        )
    }

    pub fn config_path() -> PathBuf {
        steve_home().join("config.toml")
    }

    pub fn sessions_path() -> PathBuf {
        steve_home().join("sessions.json")
    }

    pub fn logs_dir() -> PathBuf {
        steve_home().join("logs")
    }
}

/// Transport ladder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Tier 1 (event-stream client) available.
    pub event_source: bool,
    /// Tier 2 (manual stream parse) available.
    pub manual_stream: bool,
    /// Cap on waiting for one stream chunk, in seconds (0 disables).
    pub chunk_timeout_secs: u64,
    /// Cap on the non-streaming request, in seconds (0 disables).
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            event_source: true,
            manual_stream: true,
            chunk_timeout_secs: 0,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl TransportConfig {
    pub fn chunk_timeout(&self) -> Option<Duration> {
        secs(self.chunk_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        secs(self.connect_timeout_secs)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat service base URL
    pub api_url: Option<String>,

    /// Context passages per turn
    pub top_k: u32,

    /// Default knowledgebase ids
    pub knowledgebases: Vec<i64>,

    /// Prior messages sent per turn
    pub history_limit: usize,

    /// Log filter directive
    pub log_level: String,

    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            top_k: Self::DEFAULT_TOP_K,
            knowledgebases: Vec::new(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            log_level: "info".to_string(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_TOP_K: u32 = 5;
    const DEFAULT_HISTORY_LIMIT: usize = 20;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Context size to request; a zero in the file counts as 1.
    pub fn effective_top_k(&self) -> u32 {
        self.top_k.max(1)
    }

    /// Resolves the service base URL with precedence: env > config > default.
    pub fn api_url(&self) -> Result<String> {
        resolve_api_url(
            std::env::var(API_URL_ENV).ok().as_deref(),
            self.api_url.as_deref(),
        )
    }

    /// Saves only the `top_k` field to the config file.
    pub fn save_top_k(top_k: u32) -> Result<()> {
        Self::save_top_k_to(&paths::config_path(), top_k)
    }

    /// Saves only the `top_k` field to a specific config file path.
    ///
    /// Creates the file from the default template if it doesn't exist;
    /// otherwise merges the user's values into the latest template first.
    pub fn save_top_k_to(path: &Path, top_k: u32) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        if top_k == 0 {
            anyhow::bail!("top_k must be at least 1");
        }

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["top_k"] = value(i64::from(top_k));

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content atomically (temp file + rename), creating
    /// parent directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Picks the first non-blank of env and config, validating it, else the
/// default address.
fn resolve_api_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    for (candidate, origin) in [(env_url, API_URL_ENV), (config_url, "api_url")] {
        if let Some(url) = candidate {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                url::Url::parse(trimmed)
                    .with_context(|| format!("Invalid {origin} value: {trimmed}"))?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }
    }
    Ok(DEFAULT_API_URL.to_string())
}
