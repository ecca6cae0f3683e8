//! Shell tool — a restricted command interpreter over the virtual file
//! system.
//!
//! Supports a small command subset (`ls cat nl grep find mkdir rm rmdir mv
//! cp echo sed`). Commands arrive as an argv array, never a shell string;
//! there is no quoting, piping, or substitution. The shell can create,
//! delete, move, and copy files, but it never edits file content — `echo`
//! writes to stdout only and `sed` prints its result without persisting.

use async_trait::async_trait;
use atelier_core::error::ToolError;
use atelier_core::tool::{Tool, ToolResult};
use atelier_core::vfs::VirtualFileSystem;
use std::sync::Arc;
use tracing::debug;

/// The restricted interpreter.
pub struct VfsShell {
    vfs: Arc<dyn VirtualFileSystem>,
    project_id: String,
    max_output_bytes: usize,
}

impl VfsShell {
    pub fn new(vfs: Arc<dyn VirtualFileSystem>, project_id: &str, max_output_bytes: usize) -> Self {
        Self {
            vfs,
            project_id: project_id.into(),
            max_output_bytes,
        }
    }

    /// Whether a command changes VFS structure (files created, deleted,
    /// moved, or copied; directories made or removed). Content edits still
    /// only happen through the patch tool.
    pub fn mutates(command: &str) -> bool {
        matches!(command, "mkdir" | "rm" | "rmdir" | "mv" | "cp")
    }

    /// Run one argv-array command against the VFS.
    ///
    /// `Err` carries the command's error message (missing file, bad usage,
    /// unknown command); it marks the tool call failed but never aborts the
    /// run.
    pub async fn run(&self, cmd: &[String], cwd: Option<&str>) -> Result<String, String> {
        let Some((name, args)) = cmd.split_first() else {
            return Err("empty command".into());
        };
        let cwd = cwd.unwrap_or("");
        debug!(command = %name, args = args.len(), cwd, "running vfs shell command");

        let output = match name.as_str() {
            "ls" => self.ls(args, cwd).await?,
            "cat" => self.cat(args, cwd).await?,
            "nl" => self.nl(args, cwd).await?,
            "grep" => self.grep(args, cwd).await?,
            "find" => self.find(args, cwd).await?,
            "mkdir" => self.mkdir(args, cwd).await?,
            "rm" => self.rm(args, cwd).await?,
            "rmdir" => self.rmdir(args, cwd).await?,
            "mv" => self.mv(args, cwd).await?,
            "cp" => self.cp(args, cwd).await?,
            "echo" => args.join(" "),
            "sed" => self.sed(args, cwd).await?,
            other => return Err(format!("{other}: command not supported")),
        };

        Ok(self.truncate(output))
    }

    fn truncate(&self, mut output: String) -> String {
        if output.len() > self.max_output_bytes {
            let mut cut = self.max_output_bytes;
            while !output.is_char_boundary(cut) {
                cut -= 1;
            }
            output.truncate(cut);
            output.push_str("\n... [output truncated]");
        }
        output
    }

    async fn read_existing(&self, path: &str) -> Result<String, String> {
        let read = self
            .vfs
            .read_file(&self.project_id, path)
            .await
            .map_err(|e| e.to_string())?;
        if !read.exists {
            return Err(format!("{path}: No such file"));
        }
        Ok(read.content)
    }

    async fn ls(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let path = resolve(cwd, args.first().map(String::as_str).unwrap_or("."))?;
        let entries = self
            .vfs
            .list_dir(&self.project_id, &path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(entries
            .iter()
            .map(|e| {
                if e.is_dir {
                    format!("{}/", e.name)
                } else {
                    e.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn cat(&self, args: &[String], cwd: &str) -> Result<String, String> {
        if args.is_empty() {
            return Err("cat: missing operand".into());
        }
        let mut out = String::new();
        for arg in args {
            let path = resolve(cwd, arg)?;
            out.push_str(&self.read_existing(&path).await?);
        }
        Ok(out)
    }

    async fn nl(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let Some(arg) = args.first() else {
            return Err("nl: missing operand".into());
        };
        let path = resolve(cwd, arg)?;
        let content = self.read_existing(&path).await?;
        Ok(content
            .lines()
            .enumerate()
            .map(|(i, line)| format!("{:6}\t{line}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn grep(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let Some((pattern, files)) = args.split_first() else {
            return Err("grep: missing pattern".into());
        };
        if files.is_empty() {
            return Err("grep: missing file operand".into());
        }
        let mut matches = Vec::new();
        for file in files {
            let path = resolve(cwd, file)?;
            let content = self.read_existing(&path).await?;
            for line in content.lines() {
                if line.contains(pattern.as_str()) {
                    if files.len() > 1 {
                        matches.push(format!("{path}:{line}"));
                    } else {
                        matches.push(line.to_string());
                    }
                }
            }
        }
        Ok(matches.join("\n"))
    }

    async fn find(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let start = args.first().map(String::as_str).unwrap_or(".");
        let root = resolve(cwd, start)?;
        let mut out = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let entries = self
                .vfs
                .list_dir(&self.project_id, &dir)
                .await
                .map_err(|e| e.to_string())?;
            for entry in entries {
                let path = if dir.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{dir}/{}", entry.name)
                };
                out.push(path.clone());
                if entry.is_dir {
                    pending.push(path);
                }
            }
        }
        out.sort();
        Ok(out.join("\n"))
    }

    async fn mkdir(&self, args: &[String], cwd: &str) -> Result<String, String> {
        // only the -p form is supported
        let (flags, paths): (Vec<_>, Vec<_>) = args.iter().partition(|a| a.starts_with('-'));
        if flags.iter().any(|f| f.as_str() != "-p") {
            return Err("mkdir: only the -p flag is supported".into());
        }
        let Some(arg) = paths.first() else {
            return Err("mkdir: missing operand".into());
        };
        let path = resolve(cwd, arg)?;
        self.vfs
            .make_dir(&self.project_id, &path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(String::new())
    }

    async fn rm(&self, args: &[String], cwd: &str) -> Result<String, String> {
        if args.is_empty() {
            return Err("rm: missing operand".into());
        }
        for arg in args {
            let path = resolve(cwd, arg)?;
            self.vfs
                .delete_file(&self.project_id, &path)
                .await
                .map_err(|e| format!("rm: {e}"))?;
        }
        Ok(String::new())
    }

    async fn rmdir(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let Some(arg) = args.first() else {
            return Err("rmdir: missing operand".into());
        };
        let path = resolve(cwd, arg)?;
        self.vfs
            .remove_dir(&self.project_id, &path)
            .await
            .map_err(|e| format!("rmdir: {e}"))?;
        Ok(String::new())
    }

    async fn mv(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let [src, dst] = args else {
            return Err("mv: expected source and destination".into());
        };
        let src = resolve(cwd, src)?;
        let dst = resolve(cwd, dst)?;
        let content = self.read_existing(&src).await?;
        self.write_over(&dst, &content).await?;
        self.vfs
            .delete_file(&self.project_id, &src)
            .await
            .map_err(|e| format!("mv: {e}"))?;
        Ok(String::new())
    }

    async fn cp(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let [src, dst] = args else {
            return Err("cp: expected source and destination".into());
        };
        let src = resolve(cwd, src)?;
        let dst = resolve(cwd, dst)?;
        let content = self.read_existing(&src).await?;
        self.write_over(&dst, &content).await?;
        Ok(String::new())
    }

    /// Create the destination, or overwrite it when it already exists.
    async fn write_over(&self, path: &str, content: &str) -> Result<(), String> {
        let existing = self
            .vfs
            .read_file(&self.project_id, path)
            .await
            .map_err(|e| e.to_string())?;
        if existing.exists {
            self.vfs
                .update_file(&self.project_id, path, content)
                .await
                .map_err(|e| e.to_string())
        } else {
            self.vfs
                .create_file(&self.project_id, path, content)
                .await
                .map_err(|e| e.to_string())
        }
    }

    async fn sed(&self, args: &[String], cwd: &str) -> Result<String, String> {
        let [expr, file] = args else {
            return Err("sed: expected an expression and a file".into());
        };
        let (pattern, replacement, global) = parse_sed_expr(expr)?;
        let path = resolve(cwd, file)?;
        let content = self.read_existing(&path).await?;
        // display-only: the transformed text is printed, never written back
        let transformed = if global {
            content.replace(&pattern, &replacement)
        } else {
            content.replacen(&pattern, &replacement, 1)
        };
        Ok(transformed)
    }
}

/// Parse a literal `s/pattern/replacement/g` expression. Any delimiter
/// character is accepted; patterns are literal text, not regular
/// expressions.
fn parse_sed_expr(expr: &str) -> Result<(String, String, bool), String> {
    let mut chars = expr.chars();
    if chars.next() != Some('s') {
        return Err(format!("sed: unsupported expression: {expr}"));
    }
    let Some(delim) = chars.next() else {
        return Err(format!("sed: malformed expression: {expr}"));
    };
    let rest: String = chars.collect();
    let parts: Vec<&str> = rest.split(delim).collect();
    let [pattern, replacement, flags] = parts.as_slice() else {
        return Err(format!("sed: malformed expression: {expr}"));
    };
    if pattern.is_empty() {
        return Err("sed: empty pattern".into());
    }
    Ok((
        (*pattern).to_string(),
        (*replacement).to_string(),
        flags.contains('g'),
    ))
}

/// Resolve a path argument against the working directory: join, then
/// normalize `.`/`..` segments without escaping the project root.
fn resolve(cwd: &str, arg: &str) -> Result<String, String> {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else if cwd.is_empty() {
        arg.to_string()
    } else {
        format!("{cwd}/{arg}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(format!("{arg}: path escapes the project root"));
                }
            }
            s => parts.push(s),
        }
    }
    Ok(parts.join("/"))
}

/// The `shell` tool exposed to the model.
pub struct ShellTool {
    shell: VfsShell,
}

impl ShellTool {
    pub fn new(vfs: Arc<dyn VirtualFileSystem>, project_id: &str, max_output_bytes: usize) -> Self {
        Self {
            shell: VfsShell::new(vfs, project_id, max_output_bytes),
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run a restricted shell command against the project files. Supported: \
         ls, cat, nl, grep, find, mkdir -p, rm, rmdir, mv, cp, echo, sed s///g. \
         Content edits must go through json_patch; echo and sed only print."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "cmd": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "The command and its arguments as an argv array"
                },
                "cwd": {
                    "type": "string",
                    "description": "Working directory, project-relative"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Ignored; commands run synchronously in memory"
                }
            },
            "required": ["cmd"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let cmd: Vec<String> = arguments["cmd"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("missing 'cmd' array".into()))?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<_>>()
            .ok_or_else(|| ToolError::InvalidArguments("'cmd' entries must be strings".into()))?;
        let cwd = arguments["cwd"].as_str();

        match self.shell.run(&cmd, cwd).await {
            Ok(output) => {
                // structure commands must be visible to the checkpoint logic
                let mutated = cmd.first().is_some_and(|c| VfsShell::mutates(c));
                Ok(ToolResult::completed("", output)
                    .with_data(serde_json::json!({ "mutated": mutated })))
            }
            Err(message) => Ok(ToolResult::failed("", message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_vfs::InMemoryVfs;

    async fn seeded_shell() -> (Arc<InMemoryVfs>, VfsShell) {
        let vfs = Arc::new(InMemoryVfs::new());
        vfs.seed(
            "p1",
            &[
                ("index.html", "<html>\n<body>hello</body>\n</html>"),
                ("css/style.css", ".hero { color: red; }"),
                ("js/app.js", "const a = 1;\nconst b = 2;\nconsole.log(a);"),
            ],
        )
        .await;
        let shell = VfsShell::new(vfs.clone(), "p1", 64 * 1024);
        (vfs, shell)
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn ls_root() {
        let (_, shell) = seeded_shell().await;
        let out = shell.run(&argv(&["ls"]), None).await.unwrap();
        assert_eq!(out, "css/\nindex.html\njs/");
    }

    #[tokio::test]
    async fn cat_and_nl() {
        let (_, shell) = seeded_shell().await;
        let out = shell.run(&argv(&["cat", "index.html"]), None).await.unwrap();
        assert!(out.contains("<body>hello</body>"));

        let out = shell.run(&argv(&["nl", "js/app.js"]), None).await.unwrap();
        assert!(out.contains("     1\tconst a = 1;"));
        assert!(out.contains("     3\tconsole.log(a);"));
    }

    #[tokio::test]
    async fn cat_missing_file_fails() {
        let (_, shell) = seeded_shell().await;
        let err = shell.run(&argv(&["cat", "nope.txt"]), None).await.unwrap_err();
        assert!(err.contains("No such file"));
    }

    #[tokio::test]
    async fn grep_single_and_multi_file() {
        let (_, shell) = seeded_shell().await;
        let out = shell
            .run(&argv(&["grep", "const", "js/app.js"]), None)
            .await
            .unwrap();
        assert_eq!(out, "const a = 1;\nconst b = 2;");

        let out = shell
            .run(&argv(&["grep", "color", "css/style.css", "index.html"]), None)
            .await
            .unwrap();
        assert_eq!(out, "css/style.css:.hero { color: red; }");
    }

    #[tokio::test]
    async fn find_recurses() {
        let (_, shell) = seeded_shell().await;
        let out = shell.run(&argv(&["find"]), None).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"css/style.css"));
        assert!(lines.contains(&"js/app.js"));
        assert!(lines.contains(&"index.html"));
    }

    #[tokio::test]
    async fn cwd_resolution() {
        let (_, shell) = seeded_shell().await;
        let out = shell
            .run(&argv(&["cat", "style.css"]), Some("css"))
            .await
            .unwrap();
        assert!(out.contains(".hero"));

        let out = shell
            .run(&argv(&["cat", "../index.html"]), Some("css"))
            .await
            .unwrap();
        assert!(out.contains("<html>"));

        let err = shell
            .run(&argv(&["cat", "../../etc"]), Some("css"))
            .await
            .unwrap_err();
        assert!(err.contains("escapes the project root"));
    }

    #[tokio::test]
    async fn mkdir_mv_cp_rm_mutate_structure() {
        let (vfs, shell) = seeded_shell().await;
        shell.run(&argv(&["mkdir", "-p", "assets/img"]), None).await.unwrap();
        shell
            .run(&argv(&["cp", "index.html", "assets/backup.html"]), None)
            .await
            .unwrap();
        shell
            .run(&argv(&["mv", "assets/backup.html", "assets/index2.html"]), None)
            .await
            .unwrap();

        use atelier_core::vfs::VirtualFileSystem;
        assert!(vfs.read_file("p1", "assets/index2.html").await.unwrap().exists);
        assert!(!vfs.read_file("p1", "assets/backup.html").await.unwrap().exists);

        shell.run(&argv(&["rm", "assets/index2.html"]), None).await.unwrap();
        assert!(!vfs.read_file("p1", "assets/index2.html").await.unwrap().exists);

        shell.run(&argv(&["rmdir", "assets/img"]), None).await.unwrap();
    }

    #[tokio::test]
    async fn echo_is_stdout_only() {
        let (vfs, shell) = seeded_shell().await;
        let before = vfs.snapshot("p1").await;
        let out = shell.run(&argv(&["echo", "hello", "world"]), None).await.unwrap();
        assert_eq!(out, "hello world");
        let after = vfs.snapshot("p1").await;
        assert_eq!(before.files, after.files);
    }

    #[tokio::test]
    async fn sed_prints_without_persisting() {
        let (vfs, shell) = seeded_shell().await;
        let out = shell
            .run(&argv(&["sed", "s/red/blue/g", "css/style.css"]), None)
            .await
            .unwrap();
        assert_eq!(out, ".hero { color: blue; }");

        use atelier_core::vfs::VirtualFileSystem;
        let read = vfs.read_file("p1", "css/style.css").await.unwrap();
        assert_eq!(read.content, ".hero { color: red; }");
    }

    #[tokio::test]
    async fn sed_malformed_expression_fails() {
        let (_, shell) = seeded_shell().await;
        let err = shell
            .run(&argv(&["sed", "y/a/b/", "css/style.css"]), None)
            .await
            .unwrap_err();
        assert!(err.contains("unsupported expression"));
    }

    #[tokio::test]
    async fn unknown_command_fails() {
        let (_, shell) = seeded_shell().await;
        let err = shell.run(&argv(&["curl", "http://x"]), None).await.unwrap_err();
        assert!(err.contains("not supported"));
    }

    #[tokio::test]
    async fn output_truncated_at_cap() {
        let vfs = Arc::new(InMemoryVfs::new());
        vfs.seed("p1", &[("big.txt", &"x".repeat(200))]).await;
        let shell = VfsShell::new(vfs, "p1", 100);
        let out = shell.run(&argv(&["cat", "big.txt"]), None).await.unwrap();
        assert!(out.ends_with("[output truncated]"));
        assert!(out.len() < 150);
    }

    #[tokio::test]
    async fn shell_tool_wraps_interpreter() {
        let vfs = Arc::new(InMemoryVfs::new());
        vfs.seed("p1", &[("a.txt", "hi")]).await;
        let tool = ShellTool::new(vfs, "p1", 1024);

        let result = tool
            .execute(serde_json::json!({"cmd": ["cat", "a.txt"]}))
            .await
            .unwrap();
        assert_eq!(result.output, "hi");

        let result = tool
            .execute(serde_json::json!({"cmd": ["cat", "missing"]}))
            .await
            .unwrap();
        assert_eq!(result.status, atelier_core::tool::ToolStatus::Failed);

        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn structure_commands_flag_mutation_in_data() {
        let vfs = Arc::new(InMemoryVfs::new());
        vfs.seed("p1", &[("a.txt", "hi")]).await;
        let tool = ShellTool::new(vfs, "p1", 1024);

        let result = tool
            .execute(serde_json::json!({"cmd": ["rm", "a.txt"]}))
            .await
            .unwrap();
        assert_eq!(result.data.unwrap()["mutated"], true);

        let result = tool
            .execute(serde_json::json!({"cmd": ["ls"]}))
            .await
            .unwrap();
        assert_eq!(result.data.unwrap()["mutated"], false);
    }
}
