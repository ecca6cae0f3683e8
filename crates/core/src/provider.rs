//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a response
//! back, either as a complete message or as a stream of chunks. The agent
//! engine only ever talks to this trait; concrete HTTP/streaming clients
//! live outside this workspace.

use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4", "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// How the model should choose among tools
    #[serde(default)]
    pub tool_choice: ToolChoice,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}

/// Tool selection policy sent with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides whether to call tools.
    #[default]
    Auto,
    /// The model must not call tools.
    None,
    /// The model must call at least one tool.
    Required,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Add another usage record into this one.
    pub fn accumulate(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A partial tool call emitted mid-stream.
///
/// Providers stream tool calls incrementally: the first fragment for an
/// `index` names the call, later fragments append argument text. The loop
/// assembles fragments into complete [`MessageToolCall`]s before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Position of the call within this turn's call list.
    pub index: usize,

    /// Call id, present on the first fragment for this index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool name, present on the first fragment for this index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A piece of the JSON argument text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments_delta: Option<String>,
}

/// A single chunk in a streaming response.
///
/// A chunk carries either an incremental `delta` or an authoritative
/// `snapshot` of the full assistant text so far; consumers must discard
/// previously accumulated text when a snapshot arrives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental text delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,

    /// Authoritative full-text snapshot, replacing accumulated deltas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,

    /// Partial tool call fragments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls
/// `complete()` or `stream()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single terminal chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let tool_calls = response
            .message
            .tool_calls
            .iter()
            .enumerate()
            .map(|(index, tc)| ToolCallFragment {
                index,
                id: Some(tc.id.clone()),
                name: Some(tc.name.clone()),
                arguments_delta: Some(tc.arguments.clone()),
            })
            .collect();
        let _ = tx
            .send(Ok(StreamChunk {
                delta: Some(response.message.content),
                snapshot: None,
                tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

/// Assemble streamed tool-call fragments into complete tool calls.
///
/// Fragments are merged by `index`; ids and names come from the first
/// fragment that carries them, argument deltas are concatenated in arrival
/// order.
pub fn assemble_tool_calls(fragments: &[ToolCallFragment]) -> Vec<MessageToolCall> {
    let mut calls: Vec<MessageToolCall> = Vec::new();
    for frag in fragments {
        while calls.len() <= frag.index {
            calls.push(MessageToolCall {
                id: String::new(),
                name: String::new(),
                arguments: String::new(),
            });
        }
        let call = &mut calls[frag.index];
        if let Some(id) = &frag.id {
            if call.id.is_empty() {
                call.id = id.clone();
            }
        }
        if let Some(name) = &frag.name {
            if call.name.is_empty() {
                call.name = name.clone();
            }
        }
        if let Some(delta) = &frag.arguments_delta {
            call.arguments.push_str(delta);
        }
    }
    calls
}
