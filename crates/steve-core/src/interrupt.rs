//! Ctrl+C handling.
//!
//! The first Ctrl+C raises a flag that the running turn observes and turns
//! into cancellation. A second Ctrl+C before [`reset`] exits with status 130.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Notify;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INTERRUPT_NOTIFY: OnceLock<Notify> = OnceLock::new();

#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Installs the Ctrl+C handler. The handler only sets the flag; printing is
/// left to whoever observes it.
pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger_ctrl_c).context("Failed to set Ctrl+C handler")
}

fn notify() -> &'static Notify {
    INTERRUPT_NOTIFY.get_or_init(Notify::new)
}

/// Raises the interrupt flag, force-exiting on a second call.
pub fn trigger_ctrl_c() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        std::process::exit(130);
    }
    notify().notify_waiters();
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Resolves once the flag is raised.
pub async fn wait_for_interrupt() {
    loop {
        let notified = notify().notified();
        if is_interrupted() {
            return;
        }
        notified.await;
    }
}

pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_returns_after_trigger_and_reset_clears() {
        reset();
        let waiter = tokio::spawn(wait_for_interrupt());
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger_ctrl_c();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(is_interrupted());
        reset();
        assert!(!is_interrupted());
    }
}
