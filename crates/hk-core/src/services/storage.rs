use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{HostError, Result};
use crate::models::{DirectoryEntry, UploadedFile};

/// Project and file CRUD against some backing store.
///
/// `directory` arguments are workspace-relative; an empty string means the
/// workspace root.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list(&self, directory: &str) -> Result<Vec<DirectoryEntry>>;

    async fn create_project(&self, directory: &str, name: &str) -> Result<()>;

    /// Write each file directly into the project directory under its file name.
    async fn upload_files(
        &self,
        directory: &str,
        project: &str,
        files: Vec<UploadedFile>,
    ) -> Result<usize>;

    /// Write each file at its relative path inside the project, creating folders.
    async fn upload_folder(
        &self,
        directory: &str,
        project: &str,
        files: Vec<UploadedFile>,
    ) -> Result<usize>;

    async fn delete_folder(&self, directory: &str, project: &str, folder: &str) -> Result<()>;

    async fn delete_project(&self, directory: &str, name: &str) -> Result<()>;

    /// Host location of a workspace-relative project path, as handed to the launcher.
    fn deploy_path(&self, path: &str) -> Result<PathBuf>;
}

/// Stores projects as directories beneath a root on the local filesystem.
pub struct LocalProjectStore {
    root: PathBuf,
}

impl LocalProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a project, for handing to the launcher.
    pub fn project_path(&self, directory: &str, name: &str) -> Result<PathBuf> {
        let base = self.directory_path(directory)?;
        Ok(base.join(single_component(name, "project name")?))
    }

    fn directory_path(&self, directory: &str) -> Result<PathBuf> {
        Ok(self.root.join(relative_path(directory, "directory", true)?))
    }

    async fn existing_project(&self, directory: &str, project: &str) -> Result<PathBuf> {
        let path = self.project_path(directory, project)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(HostError::NotFound(format!("project directory '{project}'")));
        }
        Ok(path)
    }
}

#[async_trait]
impl ProjectStore for LocalProjectStore {
    async fn list(&self, directory: &str) -> Result<Vec<DirectoryEntry>> {
        let path = self.directory_path(directory)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(HostError::NotFound(format!("directory '{directory}'")));
        }
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = reader.next_entry().await? {
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_directory: entry.file_type().await?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn create_project(&self, directory: &str, name: &str) -> Result<()> {
        let path = self.project_path(directory, name)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(HostError::ProjectExists(name.to_string()));
        }
        tokio::fs::create_dir_all(&path).await?;
        tracing::info!(path = %path.display(), "project created");
        Ok(())
    }

    async fn upload_files(
        &self,
        directory: &str,
        project: &str,
        files: Vec<UploadedFile>,
    ) -> Result<usize> {
        if files.is_empty() {
            return Err(HostError::InvalidName("no files provided".into()));
        }
        let project_path = self.existing_project(directory, project).await?;
        let count = files.len();
        for file in files {
            let name = single_component(&file.relative_path, "file name")?;
            tokio::fs::write(project_path.join(name), &file.contents).await?;
        }
        tracing::info!(project, count, "files uploaded");
        Ok(count)
    }

    async fn upload_folder(
        &self,
        directory: &str,
        project: &str,
        files: Vec<UploadedFile>,
    ) -> Result<usize> {
        if files.is_empty() {
            return Err(HostError::InvalidName("no files provided".into()));
        }
        let project_path = self.existing_project(directory, project).await?;
        let count = files.len();
        for file in files {
            let relative = relative_path(&file.relative_path, "upload path", false)?;
            let target = project_path.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &file.contents).await?;
        }
        tracing::info!(project, count, "folder uploaded");
        Ok(count)
    }

    async fn delete_folder(&self, directory: &str, project: &str, folder: &str) -> Result<()> {
        let project_path = self.project_path(directory, project)?;
        let target = project_path.join(relative_path(folder, "folder", false)?);
        if !tokio::fs::try_exists(&target).await? {
            return Err(HostError::NotFound(format!("folder '{folder}'")));
        }
        tokio::fs::remove_dir_all(&target).await?;
        tracing::info!(path = %target.display(), "folder deleted");
        Ok(())
    }

    async fn delete_project(&self, directory: &str, name: &str) -> Result<()> {
        let path = self.existing_project(directory, name).await?;
        tokio::fs::remove_dir_all(&path).await?;
        tracing::info!(path = %path.display(), "project deleted");
        Ok(())
    }

    fn deploy_path(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(relative_path(path, "project path", false)?))
    }
}

/// Accept only plain relative components (no `..`, roots or prefixes).
fn relative_path(raw: &str, what: &str, allow_empty: bool) -> Result<PathBuf> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        if allow_empty {
            return Ok(PathBuf::new());
        }
        return Err(HostError::InvalidName(format!("{what} is required")));
    }
    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(HostError::InvalidName(format!(
                    "{what} '{raw}' must stay inside the workspace"
                )))
            }
        }
    }
    Ok(clean)
}

fn single_component(raw: &str, what: &str) -> Result<PathBuf> {
    let path = relative_path(raw, what, false)?;
    if path.components().count() != 1 {
        return Err(HostError::InvalidName(format!(
            "{what} '{raw}' must not contain path separators"
        )));
    }
    Ok(path)
}
