//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are the only way the agent acts on a project: run a restricted
//! shell command over the virtual file system, patch a file, or report a
//! goal evaluation. Tools are registered in the ToolRegistry and made
//! available to the agent loop.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A request to execute a tool, with arguments already parsed from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Lifecycle status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ToolStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Failed)
    }
}

/// The result of a tool execution.
///
/// Mutable only by the dispatcher; terminal once `completed` or `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Lifecycle status
    pub status: ToolStatus,

    /// The output content shown to the model
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// A completed result with the given output.
    pub fn completed(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Completed,
            output: output.into(),
            data: None,
            error: None,
        }
    }

    /// A failed result with the given error message.
    pub fn failed(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Failed,
            output: format!("Error: {error}"),
            data: None,
            error: Some(error),
        }
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The model's self-reported progress evaluation.
///
/// Parsed from the `evaluation` tool's arguments; the agent loop uses it as
/// the sole termination oracle for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Whether the model judges the user's goal achieved.
    pub goal_achieved: bool,

    /// Why the model reached that judgement.
    pub reasoning: String,

    /// Whether the loop should keep going.
    pub should_continue: bool,

    /// Summary of progress so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_summary: Option<String>,

    /// Work the model still intends to do.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remaining_work: Vec<String>,

    /// Anything blocking further progress.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
}

/// The core Tool trait.
///
/// Each tool (shell, json_patch, evaluation) implements this trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "json_patch").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone()).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a batch of tool definitions before sending them to a provider.
///
/// A missing or empty `name` is a hard failure: the batch is rejected with
/// an error listing every offending entry, since the name is what routes
/// tool calls back. An empty description or null parameter schema is only
/// logged — those are documentation aids, not routing data.
pub fn check_definitions(defs: &[ToolDefinition]) -> std::result::Result<(), ToolError> {
    let unnamed: Vec<String> = defs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name.trim().is_empty())
        .map(|(i, _)| format!("entry {i}"))
        .collect();

    if !unnamed.is_empty() {
        return Err(ToolError::InvalidDefinitions(format!(
            "definitions with missing name: {}",
            unnamed.join(", ")
        )));
    }

    for def in defs {
        if def.description.trim().is_empty() {
            warn!(tool = %def.name, "tool definition has no description");
        }
        if def.parameters.is_null() {
            warn!(tool = %def.name, "tool definition has no parameter schema");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult::completed("test", text))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result.status, ToolStatus::Completed);
        assert_eq!(result.output, "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn definitions_with_empty_name_rejected() {
        let defs = vec![
            ToolDefinition {
                name: "shell".into(),
                description: "ok".into(),
                parameters: serde_json::json!({}),
            },
            ToolDefinition {
                name: "".into(),
                description: "no name".into(),
                parameters: serde_json::json!({}),
            },
        ];
        let err = check_definitions(&defs).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn definitions_without_description_pass() {
        let defs = vec![ToolDefinition {
            name: "shell".into(),
            description: "".into(),
            parameters: serde_json::Value::Null,
        }];
        assert!(check_definitions(&defs).is_ok());
    }

    #[test]
    fn failed_result_formats_output() {
        let result = ToolResult::failed("call_1", "file missing");
        assert_eq!(result.status, ToolStatus::Failed);
        assert!(result.output.contains("file missing"));
        assert!(result.status.is_terminal());
    }

    #[test]
    fn evaluation_parses_optional_fields() {
        let json = r#"{"goal_achieved": true, "reasoning": "all edits applied", "should_continue": false}"#;
        let eval: Evaluation = serde_json::from_str(json).unwrap();
        assert!(eval.goal_achieved);
        assert!(!eval.should_continue);
        assert!(eval.remaining_work.is_empty());
        assert!(eval.blockers.is_empty());
    }
}
