//! The `json_patch` tool — the only tool that persists file content.
//!
//! Takes a file path and an ordered list of patch operations, runs them
//! through the patch engine, and writes the file back once if anything
//! applied. Partial application is reported, not rolled back.

use async_trait::async_trait;
use atelier_core::error::ToolError;
use atelier_core::tool::{Tool, ToolResult};
use atelier_core::vfs::VirtualFileSystem;
use atelier_patch::{apply_operations, PatchOperation};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

fn exec_failed(e: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "json_patch".into(),
        reason: e.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct PatchArgs {
    file_path: String,
    operations: Vec<PatchOperation>,
}

/// Apply structured patch operations to one file in the virtual file system.
pub struct JsonPatchTool {
    vfs: Arc<dyn VirtualFileSystem>,
    project_id: String,
}

impl JsonPatchTool {
    pub fn new(vfs: Arc<dyn VirtualFileSystem>, project_id: &str) -> Self {
        Self {
            vfs,
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl Tool for JsonPatchTool {
    fn name(&self) -> &str {
        "json_patch"
    }

    fn description(&self) -> &str {
        "Edit a file with an ordered list of operations. Each operation is one of: \
         update (replace an exact unique old_str with new_str), rewrite (replace the \
         whole file), replace_entity (replace an HTML element, function, CSS rule, \
         interface, or type alias located by its opening line). Operations apply in \
         order; a failed operation is skipped with a warning and the rest continue."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Project-relative path of the file to edit"
                },
                "operations": {
                    "type": "array",
                    "description": "Operations applied in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {
                                "type": "string",
                                "enum": ["update", "rewrite", "replace_entity"]
                            },
                            "old_str": { "type": "string" },
                            "new_str": { "type": "string" },
                            "content": { "type": "string" },
                            "selector": {
                                "type": "string",
                                "description": "Opening line of the entity to replace"
                            },
                            "replacement": { "type": "string" },
                            "entity_type": {
                                "type": "string",
                                "enum": [
                                    "html_element", "function", "react_component",
                                    "css_rule", "interface", "type"
                                ]
                            }
                        },
                        "required": ["type"]
                    }
                }
            },
            "required": ["file_path", "operations"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let args: PatchArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("json_patch: {e}")))?;
        if args.operations.is_empty() {
            return Err(ToolError::InvalidArguments(
                "json_patch: operations must not be empty".into(),
            ));
        }

        let read = self
            .vfs
            .read_file(&self.project_id, &args.file_path)
            .await
            .map_err(|e| exec_failed(e))?;
        let existing = read.exists.then_some(read.content.as_str());

        let total = args.operations.len();
        let outcome = apply_operations(existing, &args.operations);
        debug!(
            file = %args.file_path,
            applied = outcome.applied,
            warnings = outcome.warnings.len(),
            "patch operations evaluated"
        );

        // one write per call, and only when something actually applied
        let mut created = false;
        if outcome.applied > 0 {
            if read.exists {
                self.vfs
                    .update_file(&self.project_id, &args.file_path, &outcome.content)
                    .await
                    .map_err(|e| exec_failed(e))?;
            } else {
                self.vfs
                    .create_file(&self.project_id, &args.file_path, &outcome.content)
                    .await
                    .map_err(|e| exec_failed(e))?;
                created = true;
            }
            info!(file = %args.file_path, applied = outcome.applied, created, "file patched");
        }

        let mut output = format!(
            "Applied {} of {} operation{} to {}",
            outcome.applied,
            total,
            if total == 1 { "" } else { "s" },
            args.file_path
        );
        for warning in &outcome.warnings {
            output.push_str("\nWarning: ");
            output.push_str(warning);
        }

        Ok(ToolResult::completed("", output).with_data(serde_json::json!({
            "applied": outcome.applied,
            "warnings": outcome.warnings,
            "created": created,
            "mutated": outcome.applied > 0,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::tool::ToolStatus;
    use atelier_vfs::InMemoryVfs;

    async fn tool_with_file(path: &str, content: &str) -> (Arc<InMemoryVfs>, JsonPatchTool) {
        let vfs = Arc::new(InMemoryVfs::new());
        vfs.seed("p1", &[(path, content)]).await;
        let tool = JsonPatchTool::new(vfs.clone(), "p1");
        (vfs, tool)
    }

    #[tokio::test]
    async fn update_writes_back() {
        let (vfs, tool) = tool_with_file("app.js", "const x = 1;\n").await;
        let result = tool
            .execute(serde_json::json!({
                "file_path": "app.js",
                "operations": [
                    {"type": "update", "old_str": "x = 1", "new_str": "x = 2"}
                ]
            }))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Completed);
        assert!(result.output.starts_with("Applied 1 of 1 operation"));
        let data = result.data.unwrap();
        assert_eq!(data["mutated"], true);
        assert_eq!(data["created"], false);

        let read = vfs.read_file("p1", "app.js").await.unwrap();
        assert_eq!(read.content, "const x = 2;\n");
    }

    #[tokio::test]
    async fn failed_operation_reports_warning_and_skips_write() {
        let (vfs, tool) = tool_with_file("app.js", "const x = 1;\n").await;
        let result = tool
            .execute(serde_json::json!({
                "file_path": "app.js",
                "operations": [
                    {"type": "update", "old_str": "not here", "new_str": "y"}
                ]
            }))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Completed);
        assert!(result.output.contains("Applied 0 of 1"));
        assert!(result.output.contains("Warning:"));
        assert_eq!(result.data.unwrap()["mutated"], false);

        // nothing applied, nothing written
        let read = vfs.read_file("p1", "app.js").await.unwrap();
        assert_eq!(read.content, "const x = 1;\n");
    }

    #[tokio::test]
    async fn partial_batch_persists_applied_operations() {
        let (vfs, tool) = tool_with_file("app.js", "aaa\nbbb\nccc\n").await;
        let result = tool
            .execute(serde_json::json!({
                "file_path": "app.js",
                "operations": [
                    {"type": "update", "old_str": "aaa", "new_str": "AAA"},
                    {"type": "update", "old_str": "zzz", "new_str": "ZZZ"},
                    {"type": "update", "old_str": "ccc", "new_str": "CCC"}
                ]
            }))
            .await
            .unwrap();

        assert!(result.output.contains("Applied 2 of 3"));
        let read = vfs.read_file("p1", "app.js").await.unwrap();
        assert_eq!(read.content, "AAA\nbbb\nCCC\n");
    }

    #[tokio::test]
    async fn rewrite_creates_missing_file() {
        let vfs = Arc::new(InMemoryVfs::new());
        let tool = JsonPatchTool::new(vfs.clone(), "p1");
        let result = tool
            .execute(serde_json::json!({
                "file_path": "new.css",
                "operations": [
                    {"type": "rewrite", "content": "body { margin: 0; }"}
                ]
            }))
            .await
            .unwrap();

        assert_eq!(result.data.unwrap()["created"], true);
        let read = vfs.read_file("p1", "new.css").await.unwrap();
        assert!(read.exists);
        assert_eq!(read.content, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn replace_entity_end_to_end() {
        let html = "<div>\n  <ul class=\"nav\">\n    <li>Home</li>\n  </ul>\n</div>";
        let (vfs, tool) = tool_with_file("index.html", html).await;
        tool.execute(serde_json::json!({
            "file_path": "index.html",
            "operations": [{
                "type": "replace_entity",
                "selector": "<ul class=\"nav\">",
                "replacement": "<ul class=\"nav\">\n    <li>Home</li>\n    <li>About</li>\n  </ul>"
            }]
        }))
        .await
        .unwrap();

        let read = vfs.read_file("p1", "index.html").await.unwrap();
        assert!(read.content.contains("<li>About</li>"));
        assert!(read.content.ends_with("</div>"));
    }

    #[tokio::test]
    async fn malformed_arguments_rejected() {
        let (_, tool) = tool_with_file("a.txt", "x").await;
        let err = tool
            .execute(serde_json::json!({"file_path": "a.txt"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool
            .execute(serde_json::json!({"file_path": "a.txt", "operations": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool
            .execute(serde_json::json!({
                "file_path": "a.txt",
                "operations": [{"type": "teleport"}]
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
