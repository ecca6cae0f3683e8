//! # Atelier Core
//!
//! Shared domain types and trait seams for the Atelier agent execution
//! engine: conversation messages, the LLM provider contract, the tool
//! abstraction, and the external virtual-file-system and checkpoint
//! contracts the engine consumes but does not own.

pub mod checkpoint;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod vfs;

pub use checkpoint::{Checkpoint, CheckpointService};
pub use error::{Error, ProviderError, Result, ToolError, VfsError};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{
    Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallFragment, ToolChoice,
    ToolDefinition, Usage,
};
pub use tool::{Evaluation, Tool, ToolCall, ToolRegistry, ToolResult, ToolStatus};
pub use vfs::{DirEntry, FileRead, VirtualFileSystem};
