//! Conversation persistence boundary.
//!
//! Rendering never blocks on persistence: the renderer hands a finished
//! turn to the store on a background task and moves on.

use anyhow::Result;
use async_trait::async_trait;

use crate::events::AgentEvent;

/// Sink for completed turns. Implementations live with the host
/// application; this crate only defines the seam.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists a summary of one finished turn.
    async fn save_summary(&self, conversation_id: &str, events: &[AgentEvent]) -> Result<()>;

    /// Drops conversation history older than `keep_days`. Returns the
    /// number of conversations removed.
    async fn cull(&self, keep_days: u32) -> Result<u64>;
}

/// Store that discards everything. Used when the host runs without
/// persistence configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl ConversationStore for NullStore {
    async fn save_summary(&self, _conversation_id: &str, _events: &[AgentEvent]) -> Result<()> {
        Ok(())
    }

    async fn cull(&self, _keep_days: u32) -> Result<u64> {
        Ok(0)
    }
}
