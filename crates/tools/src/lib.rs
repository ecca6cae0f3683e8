//! # Atelier Tools
//!
//! The three tools the agent can call — `shell` (a restricted command
//! interpreter over the virtual file system), `json_patch` (the only tool
//! that persists content changes, via the patch engine), and `evaluation`
//! (the model's progress report) — plus the dispatcher that validates and
//! routes calls.

pub mod dispatcher;
pub mod evaluation;
pub mod json_patch;
pub mod shell;

use atelier_core::tool::ToolRegistry;
use atelier_core::vfs::VirtualFileSystem;
use std::sync::Arc;

pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use evaluation::EvaluationTool;
pub use json_patch::JsonPatchTool;
pub use shell::{ShellTool, VfsShell};

/// Build the standard tool registry for one project.
pub fn builtin_registry(
    vfs: Arc<dyn VirtualFileSystem>,
    project_id: &str,
    max_shell_output: usize,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ShellTool::new(
        vfs.clone(),
        project_id,
        max_shell_output,
    )));
    registry.register(Box::new(JsonPatchTool::new(vfs, project_id)));
    registry.register(Box::new(EvaluationTool::new()));
    registry
}
