//! # Atelier Agent
//!
//! The agent execution loop: streams model turns through the provider
//! seam, dispatches the tools each turn requests, retries transient
//! provider failures, checkpoints after file-mutating turns, and ends a
//! run only through the model's own evaluation report (or the step limit,
//! cancellation, or a fatal error).

pub mod loop_runner;
pub mod retry;
pub mod stream_event;

pub use loop_runner::{AgentLoop, RunResult};
pub use retry::RetryPolicy;
pub use stream_event::{AgentStreamEvent, StreamingEventBus};
