//! In-memory checkpoint store over [`InMemoryVfs`].

use crate::in_memory::{InMemoryVfs, ProjectFiles};
use async_trait::async_trait;
use atelier_core::checkpoint::{Checkpoint, CheckpointService};
use atelier_core::error::VfsError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct Stored {
    project_id: String,
    state: ProjectFiles,
}

/// Checkpoints as whole-project snapshots, keyed by uuid.
pub struct InMemoryCheckpoints {
    vfs: Arc<InMemoryVfs>,
    snapshots: RwLock<HashMap<String, Stored>>,
}

impl InMemoryCheckpoints {
    pub fn new(vfs: Arc<InMemoryVfs>) -> Self {
        Self {
            vfs,
            snapshots: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CheckpointService for InMemoryCheckpoints {
    async fn create_checkpoint(
        &self,
        project_id: &str,
        label: &str,
        _meta: serde_json::Value,
    ) -> Result<Checkpoint, VfsError> {
        let state = self.vfs.snapshot(project_id).await;
        let checkpoint = Checkpoint {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            created_at: Utc::now(),
        };
        debug!(project_id, checkpoint_id = %checkpoint.id, label, "checkpoint created");
        self.snapshots.write().await.insert(
            checkpoint.id.clone(),
            Stored {
                project_id: project_id.to_string(),
                state,
            },
        );
        Ok(checkpoint)
    }

    async fn restore_checkpoint(&self, id: &str) -> Result<bool, VfsError> {
        let snapshots = self.snapshots.read().await;
        let Some(stored) = snapshots.get(id) else {
            return Ok(false);
        };
        self.vfs
            .restore(&stored.project_id, stored.state.clone())
            .await;
        debug!(checkpoint_id = id, project_id = %stored.project_id, "checkpoint restored");
        Ok(true)
    }

    async fn checkpoint_exists(&self, id: &str) -> Result<bool, VfsError> {
        Ok(self.snapshots.read().await.contains_key(id))
    }
}
