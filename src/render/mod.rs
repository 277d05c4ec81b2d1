//! Turn rendering: turns a stream of agent events into terminal output.
//!
//! The renderer is a small state machine over the event stream. Text
//! phases (reasoning, intent, final answer) buffer and flush
//! incrementally; tool calls are tracked in a pending stack so results
//! can be matched back to the call they answer.

pub mod buffer;
pub mod format;
pub mod indicator;
pub mod palette;

pub use buffer::OutputBuffer;
pub use indicator::Indicator;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::events::{AgentEvent, EventKind, ToolCall};
use crate::render::palette::{CLEAR_LINE, PALETTE};
use crate::store::ConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Think,
    Intent,
    Respond,
}

/// A tool call awaiting its result. Resolution is last-in first-out:
/// nested calls finish before the call that spawned them.
struct PendingCall {
    call: ToolCall,
    key: String,
    started: Instant,
    indicator: Option<Indicator>,
}

/// Renders one conversation turn at a time to a terminal-like sink.
pub struct TurnRenderer {
    sink: Box<dyn Write + Send>,
    animate: bool,
    phase: Phase,
    buffer: OutputBuffer,
    first_chunk: bool,
    ends_with_newline: bool,
    pending: Vec<PendingCall>,
    waiting: Option<Indicator>,
    turn_events: Vec<AgentEvent>,
    tokens_used: u64,
    store: Option<Arc<dyn ConversationStore>>,
    conversation_id: String,
    persist_task: Option<JoinHandle<()>>,
}

impl TurnRenderer {
    pub fn new(config: &Config) -> Self {
        Self::with_sink(Box::new(io::stdout()), config.animate)
    }

    pub fn with_sink(sink: Box<dyn Write + Send>, animate: bool) -> Self {
        Self {
            sink,
            animate,
            phase: Phase::Idle,
            buffer: OutputBuffer::new(),
            first_chunk: true,
            ends_with_newline: true,
            pending: Vec::new(),
            waiting: None,
            turn_events: Vec::new(),
            tokens_used: 0,
            store: None,
            conversation_id: String::new(),
            persist_task: None,
        }
    }

    /// Attaches a store; finished turns are persisted on a background
    /// task without blocking rendering.
    #[must_use]
    pub fn with_store(
        mut self,
        store: Arc<dyn ConversationStore>,
        conversation_id: impl Into<String>,
    ) -> Self {
        self.store = Some(store);
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    /// Waits for any in-flight persistence from the last finished turn.
    pub async fn await_persistence(&mut self) {
        if let Some(task) = self.persist_task.take() {
            let _ = task.await;
        }
    }

    pub async fn handle_event(&mut self, event: AgentEvent) {
        // A new user query starts a fresh turn; whatever a dead turn
        // left behind (interrupt or error without an end) is dropped.
        if event.kind == EventKind::User {
            self.turn_events.clear();
            self.tokens_used = 0;
        }
        self.turn_events.push(event.clone());
        match event.kind {
            EventKind::User => self.on_user(&event).await,
            EventKind::Think => self.on_text(Phase::Think, &event).await,
            EventKind::Intent => self.on_text(Phase::Intent, &event).await,
            EventKind::Respond => self.on_text(Phase::Respond, &event).await,
            EventKind::Call => self.on_call(&event).await,
            EventKind::Execute => self.on_execute(),
            EventKind::Result => self.on_result(&event).await,
            EventKind::End => self.on_end().await,
            EventKind::Error => self.on_error(&event).await,
            EventKind::Interrupt => self.on_interrupt().await,
            EventKind::Metric => self.on_metric(&event),
            EventKind::Unknown => {
                tracing::debug!(content = %event.content, "ignoring unknown event");
            }
        }
    }

    async fn on_user(&mut self, event: &AgentEvent) {
        self.clear_waiting().await;
        self.end_text_phase();
        if event.content.trim().is_empty() {
            return;
        }
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let _ = writeln!(
            self.sink,
            "\n{}\u{203a} {}{}",
            PALETTE.cyan,
            event.content.trim(),
            PALETTE.reset
        );
        self.ends_with_newline = true;
        if self.animate {
            self.waiting = Some(Indicator::spawn("waiting"));
        }
    }

    async fn on_text(&mut self, phase: Phase, event: &AgentEvent) {
        self.clear_waiting().await;
        if self.phase != phase {
            self.end_text_phase();
            self.begin_phase(phase);
        }
        let chunk = if self.first_chunk {
            event.content.trim_start()
        } else {
            event.content.as_str()
        };
        if self.first_chunk && !chunk.is_empty() {
            self.first_chunk = false;
        }
        self.buffer.append(chunk);
        self.ends_with_newline = match phase {
            Phase::Respond => self.buffer.flush_segment(&mut self.sink, Some("\n\n"), true),
            _ => self.buffer.flush_segment(&mut self.sink, None, false),
        };
    }

    async fn on_call(&mut self, event: &AgentEvent) {
        self.clear_waiting().await;
        self.end_text_phase();
        let call = match ToolCall::parse(&event.content) {
            Ok(call) => call,
            Err(err) => {
                // A malformed call arrived for the most recent entry;
                // drop that entry so results keep lining up.
                tracing::debug!("discarding unparsable tool call: {err:#}");
                if let Some(dropped) = self.pending.pop() {
                    if let Some(indicator) = dropped.indicator {
                        indicator.stop().await;
                    }
                }
                return;
            }
        };

        let base = call.correlation_key();
        let mut key = base.clone();
        let mut n = 1;
        while self.pending.iter().any(|p| p.key == key) {
            n += 1;
            key = format!("{base}#{n}");
        }

        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let _ = write!(
            self.sink,
            "{}\u{2699} {}{}",
            PALETTE.dim,
            format::call_summary(&call),
            PALETTE.reset
        );
        let _ = self.sink.flush();
        self.ends_with_newline = false;

        self.pending.push(PendingCall {
            call,
            key,
            started: Instant::now(),
            indicator: None,
        });
    }

    fn on_execute(&mut self) {
        if !self.animate {
            return;
        }
        if let Some(entry) = self.pending.iter_mut().rev().find(|p| p.indicator.is_none()) {
            entry.indicator = Some(Indicator::spawn(&format::call_summary(&entry.call)));
        }
    }

    async fn on_result(&mut self, event: &AgentEvent) {
        let outcome = event.outcome_text();
        let is_error = event.is_error_outcome();

        let Some(mut entry) = self.pending.pop() else {
            // Result with no pending call still carries information.
            if !self.ends_with_newline {
                let _ = writeln!(self.sink);
            }
            let _ = writeln!(
                self.sink,
                "{}\u{2192} {}{}",
                PALETTE.dim,
                format::outcome_summary(outcome, is_error),
                PALETTE.reset
            );
            self.ends_with_newline = true;
            return;
        };

        if let Some(indicator) = entry.indicator.take() {
            indicator.stop().await;
        } else {
            // Overwrite the partial call line.
            let _ = write!(self.sink, "{CLEAR_LINE}");
        }

        let mark = if is_error {
            format!("{}\u{2717}{}", PALETTE.red, PALETTE.reset)
        } else {
            format!("{}\u{2713}{}", PALETTE.green, PALETTE.reset)
        };
        let elapsed = entry.started.elapsed().as_secs_f64();
        let _ = writeln!(
            self.sink,
            "{mark} {} {}\u{2192} {} ({elapsed:.1}s){}",
            format::call_summary(&entry.call),
            PALETTE.dim,
            format::outcome_summary(outcome, is_error),
            PALETTE.reset
        );
        if let Some(diff) = event.diff_text() {
            let _ = write!(self.sink, "{}", format::diff_lines(diff));
        }
        self.ends_with_newline = true;
    }

    async fn on_end(&mut self) {
        self.clear_waiting().await;
        self.clear_pending().await;
        self.end_text_phase();
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let _ = writeln!(self.sink);
        let _ = self.sink.flush();
        self.ends_with_newline = true;
        self.phase = Phase::Idle;
        self.first_chunk = true;

        let events = std::mem::take(&mut self.turn_events);
        if let Some(store) = &self.store {
            let store = Arc::clone(store);
            let id = self.conversation_id.clone();
            self.persist_task = Some(tokio::spawn(async move {
                if let Err(err) = store.save_summary(&id, &events).await {
                    tracing::warn!("failed to persist turn: {err:#}");
                }
            }));
        }
    }

    async fn on_error(&mut self, event: &AgentEvent) {
        self.clear_waiting().await;
        self.clear_pending().await;
        self.end_text_phase();
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let _ = writeln!(
            self.sink,
            "{}\u{2716} {}{}",
            PALETTE.red,
            event.content.trim(),
            PALETTE.reset
        );
        self.ends_with_newline = true;
    }

    async fn on_interrupt(&mut self) {
        self.clear_waiting().await;
        self.clear_pending().await;
        self.end_text_phase();
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let _ = writeln!(
            self.sink,
            "{}\u{25fc} interrupted{}",
            PALETTE.yellow,
            PALETTE.reset
        );
        self.ends_with_newline = true;
        self.phase = Phase::Idle;
        self.first_chunk = true;
        // An interrupt ends the turn without an end event; nothing of
        // it is persisted.
        self.turn_events.clear();
        self.tokens_used = 0;
    }

    fn on_metric(&mut self, event: &AgentEvent) {
        let tokens = event
            .payload
            .as_ref()
            .and_then(|p| p.get("tokens"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        self.tokens_used += tokens;
        tracing::debug!(
            content = %event.content,
            tokens,
            total = self.tokens_used,
            "usage metric"
        );
    }

    fn begin_phase(&mut self, phase: Phase) {
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
        }
        let marker = match phase {
            Phase::Think => format!("\n{}\u{2733} ", PALETTE.dim),
            Phase::Intent => format!("\n{}{}\u{2219}{} ", PALETTE.bold, PALETTE.magenta, PALETTE.reset),
            Phase::Respond => "\n\u{23fa} ".to_string(),
            Phase::Idle => String::new(),
        };
        let _ = write!(self.sink, "{marker}");
        let _ = self.sink.flush();
        self.phase = phase;
        self.first_chunk = true;
        self.ends_with_newline = false;
    }

    /// Drains whatever the current text phase still holds and closes
    /// the line, so subsequent output starts clean.
    fn end_text_phase(&mut self) {
        if self.phase == Phase::Idle {
            return;
        }
        self.buffer.flush_all(&mut self.sink);
        self.ends_with_newline = self.buffer.ends_with_newline();
        if self.phase == Phase::Think {
            let _ = write!(self.sink, "{}", PALETTE.reset);
        }
        if !self.ends_with_newline {
            let _ = writeln!(self.sink);
            self.ends_with_newline = true;
        }
        self.buffer = OutputBuffer::new();
        self.phase = Phase::Idle;
    }

    async fn clear_waiting(&mut self) {
        if let Some(indicator) = self.waiting.take() {
            indicator.stop().await;
        }
    }

    /// Force-resolves every outstanding call, stopping spinners. Used
    /// at end of turn so no indicator outlives its stream.
    async fn clear_pending(&mut self) {
        for entry in self.pending.drain(..) {
            if let Some(indicator) = entry.indicator {
                indicator.stop().await;
            }
        }
    }
}
