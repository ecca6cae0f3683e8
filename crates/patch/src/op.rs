//! Patch operation types.
//!
//! Operations are issued by the model as JSON and are immutable once
//! parsed. The tagged-union shape mirrors the `json_patch` tool schema.

use serde::{Deserialize, Serialize};

/// A single declarative edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchOperation {
    /// Replace one exact occurrence of `old_str` with `new_str`.
    Update { old_str: String, new_str: String },

    /// Replace the entire file content.
    Rewrite { content: String },

    /// Replace the code entity starting at `selector`.
    ReplaceEntity {
        selector: String,
        replacement: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity_type: Option<EntityType>,
    },
}

impl PatchOperation {
    /// Short operation name for warnings and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PatchOperation::Update { .. } => "update",
            PatchOperation::Rewrite { .. } => "rewrite",
            PatchOperation::ReplaceEntity { .. } => "replace_entity",
        }
    }
}

/// The kind of code entity a `replace_entity` selector points at.
///
/// Everything except `html_element` is resolved by generic brace matching;
/// the distinction mostly drives inference from the selector's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    HtmlElement,
    Function,
    ReactComponent,
    CssRule,
    Interface,
    #[serde(rename = "type")]
    TypeAlias,
}

impl EntityType {
    /// Infer the entity type from the selector's shape.
    ///
    /// `<tag` → html element; `function` / `=>` / `= (` → function;
    /// leading `.` or `#` → css rule; `interface` / `type` keywords → the
    /// matching one; anything else falls back to generic brace matching
    /// (reported as `Function` since both resolve identically).
    pub fn infer(selector: &str) -> EntityType {
        let trimmed = selector.trim_start();
        if trimmed.starts_with('<') {
            EntityType::HtmlElement
        } else if trimmed.contains("function") || trimmed.contains("=>") || trimmed.contains("= (")
        {
            EntityType::Function
        } else if trimmed.starts_with('.') || trimmed.starts_with('#') {
            EntityType::CssRule
        } else if trimmed.contains("interface") {
            EntityType::Interface
        } else if trimmed.contains("type ") {
            EntityType::TypeAlias
        } else {
            EntityType::Function
        }
    }

    /// Whether boundaries for this type are found by html tag scanning.
    pub fn is_html(&self) -> bool {
        matches!(self, EntityType::HtmlElement)
    }
}
