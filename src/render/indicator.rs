//! Animated activity indicator rendered on the current terminal line.

use std::io::{self, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::render::palette::{CLEAR_LINE, PALETTE};

const FRAMES: &[&str] = &["\u{280b}", "\u{2819}", "\u{2839}", "\u{2838}", "\u{283c}", "\u{2834}", "\u{2826}", "\u{2827}", "\u{2807}", "\u{280f}"];
const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// A background spinner that owns the current line until stopped.
///
/// The animation runs on its own task; `stop` cancels it and waits for
/// the task to erase the line, so the caller can safely print on the
/// same line immediately afterward.
pub struct Indicator {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Indicator {
    pub fn spawn(label: &str) -> Self {
        let token = CancellationToken::new();
        let label = label.to_string();
        let task = tokio::spawn(animate(label, token.clone()));
        Self { token, task }
    }

    /// Stops the animation and waits for the line to be erased.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

async fn animate(label: String, token: CancellationToken) {
    let mut stdout = io::stdout();
    let mut frame = 0usize;
    loop {
        let glyph = FRAMES[frame % FRAMES.len()];
        let _ = write!(
            stdout,
            "\r{}{glyph} {label}{}\x1b[K",
            PALETTE.dim, PALETTE.reset
        );
        let _ = stdout.flush();
        frame += 1;

        tokio::select! {
            () = token.cancelled() => break,
            () = tokio::time::sleep(FRAME_INTERVAL) => {}
        }
    }
    let _ = write!(stdout, "{CLEAR_LINE}");
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_terminates_task() {
        let indicator = Indicator::spawn("waiting");
        indicator.stop().await;
    }

    #[tokio::test]
    async fn test_stop_after_long_run() {
        let indicator = Indicator::spawn("thinking");
        tokio::time::sleep(Duration::from_millis(5)).await;
        indicator.stop().await;
    }
}
