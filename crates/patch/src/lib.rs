//! # Atelier Patch
//!
//! The deterministic patch engine behind the `json_patch` tool. Applies a
//! list of declarative edit operations to one file's text content without
//! building a syntax tree: literal substring replacement, whole-file
//! rewrite, and entity replacement driven by a small set of bracket/tag
//! boundary heuristics.
//!
//! The engine trades exactness for simplicity on purpose — it guarantees
//! mechanical, auditable application of explicit operations, not semantic
//! correctness of the result.

pub mod boundary;
pub mod engine;
pub mod op;

pub use boundary::{EntityBoundary, detect_boundary, locate_selector};
pub use engine::{PatchOutcome, apply_operations};
pub use op::{EntityType, PatchOperation};
