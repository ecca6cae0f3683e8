//! Checkpoint contract.
//!
//! After a turn that mutated project files, the agent loop requests a
//! restorable snapshot from the surrounding studio so the user can roll
//! back to "before this turn". The engine only consumes this trait.

use crate::error::VfsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A restorable snapshot of a project's file state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// The checkpoint/undo service the studio provides.
#[async_trait]
pub trait CheckpointService: Send + Sync {
    /// Snapshot the project's current file state.
    async fn create_checkpoint(
        &self,
        project_id: &str,
        label: &str,
        meta: serde_json::Value,
    ) -> std::result::Result<Checkpoint, VfsError>;

    /// Restore the project to a previous snapshot. Returns `false` if the
    /// checkpoint is unknown.
    async fn restore_checkpoint(&self, id: &str) -> std::result::Result<bool, VfsError>;

    /// Whether a checkpoint with this id exists.
    async fn checkpoint_exists(&self, id: &str) -> std::result::Result<bool, VfsError>;
}
