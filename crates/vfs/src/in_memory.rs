//! In-memory virtual file system backend.

use async_trait::async_trait;
use atelier_core::error::VfsError;
use atelier_core::vfs::{DirEntry, FileRead, VirtualFileSystem};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// One project's files and explicitly created directories.
///
/// Paths are normalized, project-relative, `/`-separated. Parent directories
/// of files exist implicitly; `dirs` tracks the ones created via `make_dir`
/// so empty directories survive listings.
#[derive(Debug, Clone, Default)]
pub struct ProjectFiles {
    pub files: BTreeMap<String, String>,
    pub dirs: BTreeSet<String>,
}

/// An in-memory VFS keyed by project id.
pub struct InMemoryVfs {
    projects: Arc<RwLock<HashMap<String, ProjectFiles>>>,
}

impl InMemoryVfs {
    pub fn new() -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed a project with files, for tests and embedding hosts.
    pub async fn seed(&self, project_id: &str, files: &[(&str, &str)]) {
        let mut projects = self.projects.write().await;
        let project = projects.entry(project_id.to_string()).or_default();
        for (path, content) in files {
            if let Ok(path) = normalize(path) {
                project.files.insert(path, (*content).to_string());
            }
        }
    }

    /// Clone a project's full state (for checkpointing).
    pub async fn snapshot(&self, project_id: &str) -> ProjectFiles {
        self.projects
            .read()
            .await
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a project's full state (for checkpoint restore).
    pub async fn restore(&self, project_id: &str, state: ProjectFiles) {
        self.projects
            .write()
            .await
            .insert(project_id.to_string(), state);
    }
}

impl Default for InMemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a project-relative path: strip leading `/` and `./` segments,
/// reject empty paths and `..` traversal.
pub fn normalize(path: &str) -> Result<String, VfsError> {
    let mut parts = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(VfsError::InvalidPath(path.to_string())),
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Err(VfsError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

/// The directory part of a normalized path, or `""` for the root.
fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

#[async_trait]
impl VirtualFileSystem for InMemoryVfs {
    async fn read_file(&self, project_id: &str, path: &str) -> Result<FileRead, VfsError> {
        let path = normalize(path)?;
        let projects = self.projects.read().await;
        match projects.get(project_id).and_then(|p| p.files.get(&path)) {
            Some(content) => Ok(FileRead {
                content: content.clone(),
                exists: true,
            }),
            None => Ok(FileRead::missing()),
        }
    }

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), VfsError> {
        let path = normalize(path)?;
        let mut projects = self.projects.write().await;
        let project = projects.entry(project_id.to_string()).or_default();
        if project.files.contains_key(&path) {
            return Err(VfsError::AlreadyExists(path));
        }
        debug!(project_id, %path, bytes = content.len(), "creating file");
        project.files.insert(path, content.to_string());
        Ok(())
    }

    async fn update_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), VfsError> {
        let path = normalize(path)?;
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        let slot = project
            .files
            .get_mut(&path)
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        debug!(project_id, %path, bytes = content.len(), "updating file");
        *slot = content.to_string();
        Ok(())
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> Result<(), VfsError> {
        let path = normalize(path)?;
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        project
            .files
            .remove(&path)
            .map(|_| ())
            .ok_or(VfsError::NotFound(path))
    }

    async fn make_dir(&self, project_id: &str, path: &str) -> Result<(), VfsError> {
        let path = normalize(path)?;
        let mut projects = self.projects.write().await;
        let project = projects.entry(project_id.to_string()).or_default();
        // mkdir -p semantics: create every missing parent too.
        let mut prefix = String::new();
        for segment in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            project.dirs.insert(prefix.clone());
        }
        Ok(())
    }

    async fn remove_dir(&self, project_id: &str, path: &str) -> Result<(), VfsError> {
        let path = normalize(path)?;
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        if !project.dirs.contains(&path) {
            return Err(VfsError::NotFound(path));
        }
        let child_prefix = format!("{path}/");
        let occupied = project.files.keys().any(|f| f.starts_with(&child_prefix))
            || project.dirs.iter().any(|d| d.starts_with(&child_prefix));
        if occupied {
            return Err(VfsError::DirectoryNotEmpty(path));
        }
        project.dirs.remove(&path);
        Ok(())
    }

    async fn list_dir(&self, project_id: &str, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let prefix = match normalize(path) {
            Ok(p) => format!("{p}/"),
            // "" / "." / "/" list the project root
            Err(_) if path.trim_matches(['/', '.']).is_empty() => String::new(),
            Err(e) => return Err(e),
        };
        let projects = self.projects.read().await;
        let Some(project) = projects.get(project_id) else {
            return Ok(Vec::new());
        };

        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        for file in project.files.keys() {
            if let Some(rest) = file.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => entries.insert(dir.to_string(), true),
                    None => entries.insert(rest.to_string(), false),
                };
            }
        }
        for dir in &project.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                let name = rest.split('/').next().unwrap_or(rest);
                if !name.is_empty() {
                    entries.insert(name.to_string(), true);
                }
            }
        }

        Ok(entries
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_read_update_delete() {
        let vfs = InMemoryVfs::new();
        vfs.create_file("p1", "index.html", "<html></html>")
            .await
            .unwrap();

        let read = vfs.read_file("p1", "index.html").await.unwrap();
        assert!(read.exists);
        assert_eq!(read.content, "<html></html>");

        vfs.update_file("p1", "index.html", "<html><body/></html>")
            .await
            .unwrap();
        let read = vfs.read_file("p1", "index.html").await.unwrap();
        assert_eq!(read.content, "<html><body/></html>");

        vfs.delete_file("p1", "index.html").await.unwrap();
        let read = vfs.read_file("p1", "index.html").await.unwrap();
        assert!(!read.exists);
    }

    #[tokio::test]
    async fn missing_file_reads_as_nonexistent() {
        let vfs = InMemoryVfs::new();
        let read = vfs.read_file("p1", "nope.css").await.unwrap();
        assert!(!read.exists);
        assert!(read.content.is_empty());
    }

    #[tokio::test]
    async fn create_existing_fails() {
        let vfs = InMemoryVfs::new();
        vfs.create_file("p1", "a.js", "1").await.unwrap();
        let err = vfs.create_file("p1", "a.js", "2").await.unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let vfs = InMemoryVfs::new();
        let err = vfs.read_file("p1", "../secrets").await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn mkdir_creates_parents_and_rmdir_requires_empty() {
        let vfs = InMemoryVfs::new();
        vfs.make_dir("p1", "src/components/ui").await.unwrap();
        vfs.create_file("p1", "src/components/ui/button.js", "x")
            .await
            .unwrap();

        let err = vfs.remove_dir("p1", "src/components/ui").await.unwrap_err();
        assert!(matches!(err, VfsError::DirectoryNotEmpty(_)));

        vfs.delete_file("p1", "src/components/ui/button.js")
            .await
            .unwrap();
        vfs.remove_dir("p1", "src/components/ui").await.unwrap();
        let entries = vfs.list_dir("p1", "src/components").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn list_root_and_subdir() {
        let vfs = InMemoryVfs::new();
        vfs.seed(
            "p1",
            &[
                ("index.html", "a"),
                ("css/style.css", "b"),
                ("css/theme.css", "c"),
            ],
        )
        .await;

        let root = vfs.list_dir("p1", "").await.unwrap();
        let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["css", "index.html"]);
        assert!(root[0].is_dir);
        assert!(!root[1].is_dir);

        let css = vfs.list_dir("p1", "css").await.unwrap();
        assert_eq!(css.len(), 2);
        assert!(css.iter().all(|e| !e.is_dir));
    }

    #[tokio::test]
    async fn snapshot_and_restore_round_trip() {
        let vfs = InMemoryVfs::new();
        vfs.seed("p1", &[("a.txt", "before")]).await;
        let snap = vfs.snapshot("p1").await;

        vfs.update_file("p1", "a.txt", "after").await.unwrap();
        vfs.restore("p1", snap).await;

        let read = vfs.read_file("p1", "a.txt").await.unwrap();
        assert_eq!(read.content, "before");
    }
}
