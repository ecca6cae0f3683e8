//! The `evaluation` tool — the model's structured progress report.
//!
//! Executing it has no side effects; it validates the arguments, echoes the
//! judgement back, and carries the parsed [`Evaluation`] in its result data
//! so the agent loop can read it as the termination signal.

use async_trait::async_trait;
use atelier_core::error::ToolError;
use atelier_core::tool::{Evaluation, Tool, ToolResult};
use tracing::debug;

pub struct EvaluationTool;

impl EvaluationTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EvaluationTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EvaluationTool {
    fn name(&self) -> &str {
        "evaluation"
    }

    fn description(&self) -> &str {
        "Report whether the user's goal has been achieved and whether to keep \
         working. Call this after every batch of work; the run only ends \
         cleanly through this report."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "goal_achieved": {
                    "type": "boolean",
                    "description": "Whether the user's goal is fully achieved"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Why you reached this judgement"
                },
                "should_continue": {
                    "type": "boolean",
                    "description": "Whether to keep working this run"
                },
                "progress_summary": { "type": "string" },
                "remaining_work": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "blockers": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["goal_achieved", "reasoning", "should_continue"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let evaluation: Evaluation = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("evaluation: {e}")))?;
        debug!(
            goal_achieved = evaluation.goal_achieved,
            should_continue = evaluation.should_continue,
            "evaluation reported"
        );

        let verdict = if evaluation.goal_achieved {
            "goal achieved"
        } else if evaluation.should_continue {
            "continuing"
        } else {
            "stopping short of the goal"
        };
        let output = format!("Evaluation recorded ({verdict}): {}", evaluation.reasoning);

        let data = serde_json::to_value(&evaluation).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "evaluation".into(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult::completed("", output).with_data(data))
    }
}
