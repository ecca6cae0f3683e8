//! Tool dispatch — validate a model-issued tool call, execute it through
//! the registry, and normalize every failure mode into a failed
//! [`ToolResult`] so the model can see and recover from it.
//!
//! Dispatch never aborts a run: a bad tool name, unparseable arguments, or
//! an execution error all come back as results, not errors.

use atelier_core::message::MessageToolCall;
use atelier_core::tool::{Evaluation, ToolCall, ToolRegistry, ToolResult};
use tracing::{debug, warn};

/// What the agent loop gets back from one dispatched call.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The result to feed back to the model.
    pub result: ToolResult,

    /// Whether the call changed project files.
    pub mutated: bool,

    /// The parsed evaluation, when this was a completed `evaluation` call.
    pub evaluation: Option<Evaluation>,
}

/// Routes tool calls to registered tools.
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call as the model issued it.
    ///
    /// `arguments` arrive as the raw JSON string accumulated from the
    /// stream; an empty string is treated as `{}` since some providers omit
    /// the arguments entirely for zero-parameter calls.
    pub async fn dispatch(&self, call: &MessageToolCall) -> DispatchOutcome {
        if call.name.trim().is_empty() {
            warn!(call_id = %call.id, "tool call with empty name");
            return Self::failed(call, "tool call has no name");
        }

        let arguments: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(value) => value,
                Err(e) => {
                    warn!(call_id = %call.id, tool = %call.name, error = %e,
                          "tool call arguments are not valid JSON");
                    return Self::failed(call, &format!("arguments are not valid JSON: {e}"));
                }
            }
        };

        let parsed = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        };
        debug!(call_id = %parsed.id, tool = %parsed.name, "dispatching tool call");

        let mut result = match self.registry.execute(&parsed).await {
            Ok(result) => result,
            Err(e) => {
                warn!(call_id = %call.id, tool = %call.name, error = %e, "tool call failed");
                return Self::failed(call, &e.to_string());
            }
        };
        // tools don't know their call id; stamp it here
        result.call_id = call.id.clone();

        let mutated = result
            .data
            .as_ref()
            .and_then(|d| d["mutated"].as_bool())
            .unwrap_or(false);

        let evaluation = if call.name == "evaluation" && result.status.is_terminal() {
            result
                .data
                .clone()
                .and_then(|d| serde_json::from_value(d).ok())
        } else {
            None
        };

        DispatchOutcome {
            result,
            mutated,
            evaluation,
        }
    }

    fn failed(call: &MessageToolCall, message: &str) -> DispatchOutcome {
        DispatchOutcome {
            result: ToolResult::failed(call.id.clone(), message),
            mutated: false,
            evaluation: None,
        }
    }
}
