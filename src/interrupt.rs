//! Ctrl+C handling shared by the turn loop.
//!
//! The signal handler never touches the terminal. It flips a flag and
//! wakes the turn loop, which lets the renderer close out whatever line
//! it currently owns before the interruption marker prints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INTERRUPT_NOTIFY: OnceLock<tokio::sync::Notify> = OnceLock::new();

/// Installs the process-wide Ctrl+C hook. Call once before the first
/// turn.
///
/// # Panics
/// Panics when another handler already owns the signal.
pub fn init() {
    ctrlc::set_handler(trigger).expect("ctrl+c handler already installed");
}

/// Records an interrupt request and wakes any waiter.
///
/// A request arriving while the previous one is still unhandled means
/// the loop is stuck; the process exits with 130 instead of queueing.
pub fn trigger() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        std::process::exit(130);
    }
    INTERRUPT_NOTIFY
        .get_or_init(tokio::sync::Notify::new)
        .notify_waiters();
}

/// Whether an interrupt request is pending.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Resolves once an interrupt request is pending, immediately if one
/// already is.
pub async fn wait_for_interrupt() {
    loop {
        if is_interrupted() {
            return;
        }
        INTERRUPT_NOTIFY
            .get_or_init(tokio::sync::Notify::new)
            .notified()
            .await;
    }
}

/// Clears a handled request so the next turn starts clean.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}
