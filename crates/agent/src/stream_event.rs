//! Run event stream — what the studio UI renders while a run executes.
//!
//! Every externally visible moment of a run is published as one
//! [`AgentStreamEvent`] on a broadcast bus. The loop never waits for
//! consumers; a run with no subscribers executes identically.

use atelier_core::tool::{Evaluation, ToolResult, ToolStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One externally visible moment of an agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Incremental assistant text.
    AssistantDelta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Authoritative full text so far; replaces everything accumulated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot: Option<String>,
    },

    /// The assistant finished a turn that requested tool calls.
    ToolCalls { names: Vec<String> },

    /// A tool call changed lifecycle state.
    ToolStatus {
        id: String,
        name: String,
        status: ToolStatus,
    },

    /// A tool call finished, with its full result.
    ToolResult { result: ToolResult },

    /// Usage and cost after one model turn.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
        cost: f64,
    },

    /// The model reported a progress evaluation.
    Evaluation { evaluation: Evaluation },

    /// A labelled marker in the transcript (retries, run boundaries).
    Divider { label: String },

    /// A non-fatal or fatal error surfaced to the user.
    Error { message: String },
}

/// Broadcast bus for run events.
///
/// Thin wrapper over [`tokio::sync::broadcast`]; publishing with no
/// subscribers is a no-op, and slow subscribers lose old events rather than
/// backpressuring the run.
#[derive(Clone)]
pub struct StreamingEventBus {
    sender: broadcast::Sender<AgentStreamEvent>,
}

impl StreamingEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: AgentStreamEvent) {
        // a send error only means nobody is listening
        let _ = self.sender.send(event);
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentStreamEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StreamingEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
