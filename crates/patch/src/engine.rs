//! Sequential application of patch operations.
//!
//! Operations run against the running content, not the original, so later
//! operations see earlier edits. Failures are per-operation warnings, never
//! fatal to the batch; the caller writes the result back exactly once, and
//! only when at least one operation applied.

use crate::boundary::{detect_boundary, locate_selector};
use crate::op::{EntityType, PatchOperation};
use tracing::debug;

/// The outcome of applying a batch of operations.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The fully computed content after all applied operations.
    pub content: String,

    /// How many operations actually landed.
    pub applied: usize,

    /// One entry per skipped or ambiguous operation.
    pub warnings: Vec<String>,
}

/// Apply a list of operations to one file's content.
///
/// `None` content means the file does not exist yet; it is treated as empty
/// and the caller creates the file only if `applied > 0`.
pub fn apply_operations(file_content: Option<&str>, ops: &[PatchOperation]) -> PatchOutcome {
    let mut content = file_content.unwrap_or_default().to_string();
    let mut applied = 0usize;
    let mut warnings = Vec::new();

    for (index, op) in ops.iter().enumerate() {
        match apply_one(&content, op) {
            Ok(next) => {
                content = next;
                applied += 1;
                debug!(op = op.kind(), index, "patch operation applied");
            }
            Err(warning) => {
                let warning = format!("operation {index} ({}): {warning}", op.kind());
                debug!(op = op.kind(), index, %warning, "patch operation skipped");
                warnings.push(warning);
            }
        }
    }

    PatchOutcome {
        content,
        applied,
        warnings,
    }
}

/// Apply a single operation, returning the new content or a warning.
fn apply_one(content: &str, op: &PatchOperation) -> Result<String, String> {
    match op {
        PatchOperation::Update { old_str, new_str } => {
            if old_str.is_empty() {
                return Err("old_str is empty".into());
            }
            let occurrences = content.matches(old_str.as_str()).count();
            match occurrences {
                0 => Err("old_str not found in file".into()),
                1 => Ok(content.replacen(old_str.as_str(), new_str, 1)),
                n => Err(format!(
                    "old_str occurs {n} times; a unique match is required"
                )),
            }
        }

        PatchOperation::Rewrite { content: new } => Ok(new.clone()),

        PatchOperation::ReplaceEntity {
            selector,
            replacement,
            entity_type,
        } => {
            let at = locate_selector(content, selector)
                .ok_or_else(|| format!("selector not found: {selector:?}"))?;
            let kind = entity_type.unwrap_or_else(|| EntityType::infer(selector));
            let boundary = detect_boundary(content, at, kind).ok_or_else(|| {
                format!("no balanced boundary for {kind:?} entity at selector {selector:?}")
            })?;

            let mut next = String::with_capacity(
                content.len() - (boundary.end - boundary.start) + replacement.len(),
            );
            next.push_str(&content[..boundary.start]);
            next.push_str(replacement);
            next.push_str(&content[boundary.end..]);
            Ok(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(old: &str, new: &str) -> PatchOperation {
        PatchOperation::Update {
            old_str: old.into(),
            new_str: new.into(),
        }
    }

    #[test]
    fn update_unique_occurrence_applies() {
        let outcome = apply_operations(Some("hello world"), &[update("world", "studio")]);
        assert_eq!(outcome.content, "hello studio");
        assert_eq!(outcome.applied, 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn update_missing_occurrence_warns() {
        let outcome = apply_operations(Some("hello world"), &[update("mars", "x")]);
        assert_eq!(outcome.content, "hello world");
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("not found"));
    }

    #[test]
    fn update_ambiguous_occurrence_warns() {
        let outcome = apply_operations(Some("aa bb aa"), &[update("aa", "cc")]);
        assert_eq!(outcome.content, "aa bb aa");
        assert_eq!(outcome.applied, 0);
        assert!(outcome.warnings[0].contains("2 times"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let op = PatchOperation::Rewrite {
            content: "X".into(),
        };
        let once = apply_operations(Some("original"), std::slice::from_ref(&op));
        let twice = apply_operations(Some(&once.content), std::slice::from_ref(&op));
        assert_eq!(once.content, "X");
        assert_eq!(twice.content, "X");
        assert_eq!(twice.applied, 1);
    }

    #[test]
    fn operations_see_earlier_edits() {
        let ops = [update("one", "two"), update("two", "three")];
        let outcome = apply_operations(Some("one"), &ops);
        assert_eq!(outcome.content, "three");
        assert_eq!(outcome.applied, 2);
    }

    #[test]
    fn failed_middle_operation_does_not_stop_batch() {
        let ops = [
            update("a", "b"),
            PatchOperation::Update {
                old_str: String::new(),
                new_str: "x".into(),
            },
            update("c", "d"),
        ];
        let outcome = apply_operations(Some("a c"), &ops);
        assert_eq!(outcome.content, "b d");
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn missing_file_treated_as_empty() {
        let outcome = apply_operations(
            None,
            &[PatchOperation::Rewrite {
                content: "new file body".into(),
            }],
        );
        assert_eq!(outcome.content, "new file body");
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn missing_file_update_warns_without_creating_content() {
        let outcome = apply_operations(None, &[update("anything", "x")]);
        assert_eq!(outcome.applied, 0);
        assert!(outcome.content.is_empty());
    }

    #[test]
    fn replace_entity_function_preserves_trailing_content() {
        let content = "function f() { return 1; }\nconsole.log(f());";
        let op = PatchOperation::ReplaceEntity {
            selector: "function f()".into(),
            replacement: "function f() { return 2; }".into(),
            entity_type: Some(EntityType::Function),
        };
        let outcome = apply_operations(Some(content), &[op]);
        assert_eq!(
            outcome.content,
            "function f() { return 2; }\nconsole.log(f());"
        );
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn replace_entity_html_by_inference() {
        let content = "<header><h1>Old</h1></header><main>body</main>";
        let op = PatchOperation::ReplaceEntity {
            selector: "<header>".into(),
            replacement: "<header><h1>New</h1></header>".into(),
            entity_type: None,
        };
        let outcome = apply_operations(Some(content), &[op]);
        assert_eq!(
            outcome.content,
            "<header><h1>New</h1></header><main>body</main>"
        );
    }

    #[test]
    fn replace_entity_css_rule() {
        let content = "body { margin: 0; }\n.hero { color: red; }\nfooter { color: gray; }";
        let op = PatchOperation::ReplaceEntity {
            selector: ".hero".into(),
            replacement: ".hero { color: blue; }".into(),
            entity_type: None,
        };
        let outcome = apply_operations(Some(content), &[op]);
        assert!(outcome.content.contains(".hero { color: blue; }"));
        assert!(outcome.content.contains("footer { color: gray; }"));
    }

    #[test]
    fn replace_entity_selector_missing_warns() {
        let op = PatchOperation::ReplaceEntity {
            selector: ".nope".into(),
            replacement: "x".into(),
            entity_type: None,
        };
        let outcome = apply_operations(Some("body {}"), &[op]);
        assert_eq!(outcome.applied, 0);
        assert!(outcome.warnings[0].contains("selector not found"));
    }

    #[test]
    fn replace_entity_unbalanced_warns() {
        let op = PatchOperation::ReplaceEntity {
            selector: "function broken()".into(),
            replacement: "x".into(),
            entity_type: Some(EntityType::Function),
        };
        let outcome = apply_operations(Some("function broken() { oops"), &[op]);
        assert_eq!(outcome.applied, 0);
        assert!(outcome.warnings[0].contains("no balanced boundary"));
    }

    #[test]
    fn replace_entity_whitespace_tolerant_selector() {
        let content = ".card { padding: 4px; }";
        let op = PatchOperation::ReplaceEntity {
            selector: "   .card {".into(),
            replacement: ".card { padding: 8px; }".into(),
            entity_type: None,
        };
        let outcome = apply_operations(Some(content), &[op]);
        assert_eq!(outcome.content, ".card { padding: 8px; }");
    }
}
