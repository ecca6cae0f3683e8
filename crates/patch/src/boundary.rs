//! Entity boundary detection.
//!
//! Given a selector match inside a file, these functions compute the
//! `[start, end)` text range of the code entity that starts there: an HTML
//! element balanced by tag depth, or a brace-delimited block for everything
//! else. Raw character scans by design — no string-literal or comment
//! awareness, matching the engine's no-parser posture.

use crate::op::EntityType;
use serde::{Deserialize, Serialize};

/// A derived, ephemeral `[start, end)` byte range into a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBoundary {
    pub start: usize,
    pub end: usize,
}

/// Locate a selector in the content, tolerating whitespace variants.
///
/// Preference order: exact match, then left-trimmed, right-trimmed, and
/// fully trimmed. Returns the byte offset where the matched variant begins.
pub fn locate_selector(content: &str, selector: &str) -> Option<usize> {
    if selector.trim().is_empty() {
        return None;
    }
    if let Some(at) = content.find(selector) {
        return Some(at);
    }
    let left = selector.trim_start();
    if left != selector {
        if let Some(at) = content.find(left) {
            return Some(at);
        }
    }
    let right = selector.trim_end();
    if right != selector {
        if let Some(at) = content.find(right) {
            return Some(at);
        }
    }
    let both = selector.trim();
    if both != left && both != right {
        if let Some(at) = content.find(both) {
            return Some(at);
        }
    }
    None
}

/// Compute the boundary of the entity starting at `start`.
///
/// HTML elements are scanned by tag depth; every other kind uses generic
/// brace matching. Returns `None` when no balanced close is found.
pub fn detect_boundary(content: &str, start: usize, kind: EntityType) -> Option<EntityBoundary> {
    if kind.is_html() {
        html_element_boundary(content, start)
    } else {
        brace_boundary(content, start)
    }
}

/// Scan forward from an opening tag, tracking nested same-tag depth until
/// the balancing close tag. A self-closing (`/>`) opener closes immediately.
fn html_element_boundary(content: &str, start: usize) -> Option<EntityBoundary> {
    let rest = &content[start..];
    if !rest.starts_with('<') {
        return None;
    }
    let name: String = rest[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        return None;
    }

    let open = format!("<{name}");
    let close = format!("</{name}");
    let mut depth: usize = 0;
    let mut pos = start;

    while pos < content.len() {
        let rest = &content[pos..];
        if rest.starts_with(&close) && tag_name_ends(rest, close.len()) {
            let gt = rest.find('>')?;
            let end = pos + gt + 1;
            if depth <= 1 {
                return Some(EntityBoundary { start, end });
            }
            depth -= 1;
            pos = end;
        } else if rest.starts_with(&open) && tag_name_ends(rest, open.len()) {
            let gt = rest.find('>')?;
            let end = pos + gt + 1;
            let self_closing = rest[..gt].trim_end().ends_with('/');
            if self_closing {
                if depth == 0 {
                    return Some(EntityBoundary { start, end });
                }
                // nested self-closing same-tag element: depth unchanged
            } else {
                depth += 1;
            }
            pos = end;
        } else {
            pos += rest.chars().next()?.len_utf8();
        }
    }
    None
}

/// True when the character after a `<name` / `</name` prefix does not
/// continue the tag name (so `<di` never matches `<div`).
fn tag_name_ends(rest: &str, prefix_len: usize) -> bool {
    match rest[prefix_len..].chars().next() {
        Some(c) => !(c.is_ascii_alphanumeric() || c == '-'),
        None => true,
    }
}

/// Find the first `{` at or after `start`, track depth, and close at the
/// matching `}`.
fn brace_boundary(content: &str, start: usize) -> Option<EntityBoundary> {
    let open_rel = content[start..].find('{')?;
    let scan_from = start + open_rel;
    let mut depth: usize = 0;
    for (i, ch) in content[scan_from..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(EntityBoundary {
                        start,
                        end: scan_from + i + 1,
                    });
                }
            }
            _ => {}
        }
    }
    None
}
