//! File logging bootstrap.
//!
//! Logs go to a daily-rolling file under `<STEVE_HOME>/logs/` so stdout stays
//! reserved for chat output.

use std::fs;

use steve_core::config::{self, Config};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STEVE_LOG";
const LOG_FILE_PREFIX: &str = "steve.log";

/// Picks the filter directive: `STEVE_LOG` > `log_level` > `info`.
fn filter_directive(env: Option<String>, config: &Config) -> String {
    env.filter(|value| !value.trim().is_empty())
        .or_else(|| Some(config.log_level.clone()).filter(|l| !l.trim().is_empty()))
        .unwrap_or_else(|| "info".to_string())
}

/// Installs the global subscriber. Returns the guard that flushes the
/// non-blocking writer on drop, or `None` when logging could not be set up.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    let dir = config::paths::logs_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("Warning: logging disabled ({}): {e}", dir.display());
        return None;
    }

    let directive = filter_directive(std::env::var(LOG_ENV).ok(), config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    if installed.is_err() {
        return None;
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "steve starting");
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins_over_config() {
        let config = Config {
            log_level: "warn".into(),
            ..Config::default()
        };
        assert_eq!(filter_directive(Some("debug".into()), &config), "debug");
        assert_eq!(filter_directive(None, &config), "warn");
        assert_eq!(filter_directive(Some("  ".into()), &config), "warn");
    }

    #[test]
    fn test_falls_back_to_info() {
        let config = Config {
            log_level: String::new(),
            ..Config::default()
        };
        assert_eq!(filter_directive(None, &config), "info");
    }
}
