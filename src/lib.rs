//! skein: streaming terminal presentation for an agent CLI.
//!
//! The crate sits between an agent engine and the terminal. Raw bytes
//! from a streaming endpoint are reassembled into token events
//! ([`stream::FrameReassembler`]), agent events drive a per-turn render
//! state machine ([`render::TurnRenderer`]), and buffered text flushes
//! incrementally with markdown styling decided once per phase
//! ([`render::OutputBuffer`]).

pub mod config;
pub mod events;
pub mod interrupt;
pub mod markdown;
pub mod render;
pub mod store;
pub mod stream;
pub mod turn;

pub use config::Config;
pub use events::{AgentEvent, EventKind, ToolCall};
pub use render::TurnRenderer;
pub use store::{ConversationStore, NullStore};
pub use stream::{EndpointClient, EndpointError, FrameReassembler, TokenEvent};
pub use turn::{run_turn, Agent, TurnOutcome};

/// Wires tracing to stderr, honoring `RUST_LOG`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
