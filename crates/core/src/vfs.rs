//! Virtual file system contract.
//!
//! Projects live in browser storage owned by the surrounding studio; the
//! engine only consumes this trait. During a run the agent loop is the sole
//! writer — the studio must not let manual edits race with it.

use crate::error::VfsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The outcome of reading a file: content plus whether the file exists.
///
/// A missing file is not an error for callers like the patch tool, which
/// treats it as empty content and may create the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRead {
    pub content: String,
    pub exists: bool,
}

impl FileRead {
    /// A read of a file that does not exist.
    pub fn missing() -> Self {
        Self {
            content: String::new(),
            exists: false,
        }
    }
}

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// The virtual file system the engine's tools operate on.
///
/// All operations are keyed by project id; paths are project-relative with
/// `/` separators.
#[async_trait]
pub trait VirtualFileSystem: Send + Sync {
    /// Read a file. Returns `exists: false` rather than an error when the
    /// path has no file.
    async fn read_file(
        &self,
        project_id: &str,
        path: &str,
    ) -> std::result::Result<FileRead, VfsError>;

    /// Create a new file. Fails if the file already exists.
    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> std::result::Result<(), VfsError>;

    /// Overwrite an existing file's content.
    async fn update_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> std::result::Result<(), VfsError>;

    /// Delete a file.
    async fn delete_file(&self, project_id: &str, path: &str)
    -> std::result::Result<(), VfsError>;

    /// Create a directory, including missing parents.
    async fn make_dir(&self, project_id: &str, path: &str) -> std::result::Result<(), VfsError>;

    /// Remove an empty directory.
    async fn remove_dir(&self, project_id: &str, path: &str) -> std::result::Result<(), VfsError>;

    /// List the entries directly under a directory.
    async fn list_dir(
        &self,
        project_id: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, VfsError>;
}
