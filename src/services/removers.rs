//! Deletion strategies, one per artifact kind.
//!
//! A remover acts on exactly one artifact and reports one outcome. It never
//! retries and never looks at other artifacts; batching and failure
//! isolation belong to the engine.

use crate::models::artifact::{META_KEY, META_VALUE_NAME};
use crate::models::{Artifact, ArtifactKind};
use crate::platform::{Platform, PlatformError, Registry, ServiceControl, TaskScheduler};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Why a single artifact could not be removed.
#[derive(Error, Debug)]
pub enum RemovalError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Failed to delete {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} is missing `{1}` metadata")]
    MissingMetadata(String, &'static str),
}

impl RemovalError {
    /// The target was already gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            RemovalError::Platform(e) => e.is_not_found(),
            RemovalError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            RemovalError::MissingMetadata(..) => false,
        }
    }
}

/// Removes one artifact.
#[async_trait]
pub trait Remover: Send + Sync {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError>;
}

fn io_error(path: &Path, source: io::Error) -> RemovalError {
    RemovalError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Clear the read-only flag on `path` and, for directories, everything below.
fn clear_readonly(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            clear_readonly(&entry?.path())?;
        }
    }
    let mut permissions = metadata.permissions();
    if permissions.readonly() && !metadata.file_type().is_symlink() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

/// Delete a file or directory tree, retrying once with read-only flags cleared.
fn force_remove(path: &Path) -> Result<(), RemovalError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| io_error(path, e))?;
    // Links are removed themselves, never their target. Windows directory
    // links and junctions only go away through remove_dir.
    let dir_link = metadata.file_type().is_symlink()
        && fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);
    let remove = |p: &Path| {
        if metadata.is_dir() {
            fs::remove_dir_all(p)
        } else if dir_link && cfg!(windows) {
            fs::remove_dir(p)
        } else {
            fs::remove_file(p)
        }
    };

    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::debug!("Clearing read-only attributes on {}", path.display());
            clear_readonly(path).map_err(|e| io_error(path, e))?;
            remove(path).map_err(|e| io_error(path, e))
        }
        Err(e) => Err(io_error(path, e)),
    }
}

/// Recursive force-delete of directories and temp entries.
pub struct PathRemover;

#[async_trait]
impl Remover for PathRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        force_remove(Path::new(&artifact.identifier))
    }
}

/// Force-delete of a single startup file.
pub struct FileRemover;

#[async_trait]
impl Remover for FileRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        let path = Path::new(&artifact.identifier);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                clear_readonly(path).map_err(|e| io_error(path, e))?;
                fs::remove_file(path).map_err(|e| io_error(path, e))
            }
            Err(e) => Err(io_error(path, e)),
        }
    }
}

/// Recursive registry key delete.
pub struct RegistryKeyRemover {
    registry: Arc<dyn Registry>,
}

impl RegistryKeyRemover {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Remover for RegistryKeyRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        Ok(self.registry.delete_key(&artifact.identifier).await?)
    }
}

/// Deletes one named value under its run key, leaving the key alone.
pub struct StartupValueRemover {
    registry: Arc<dyn Registry>,
}

impl StartupValueRemover {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Remover for StartupValueRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        let key = artifact
            .meta(META_KEY)
            .ok_or_else(|| RemovalError::MissingMetadata(artifact.identifier.clone(), META_KEY))?;
        let name = artifact.meta(META_VALUE_NAME).ok_or_else(|| {
            RemovalError::MissingMetadata(artifact.identifier.clone(), META_VALUE_NAME)
        })?;
        Ok(self.registry.delete_value(key, name).await?)
    }
}

/// Stops a service (best effort), then deletes it.
pub struct ServiceRemover {
    services: Arc<dyn ServiceControl>,
}

impl ServiceRemover {
    pub fn new(services: Arc<dyn ServiceControl>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Remover for ServiceRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        let name = &artifact.identifier;
        if let Err(e) = self.services.stop(name).await {
            tracing::debug!("Stopping service {} failed, deleting anyway: {}", name, e);
        }
        Ok(self.services.delete(name).await?)
    }
}

/// Unregisters a scheduled task by its full path.
pub struct TaskRemover {
    tasks: Arc<dyn TaskScheduler>,
}

impl TaskRemover {
    pub fn new(tasks: Arc<dyn TaskScheduler>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Remover for TaskRemover {
    async fn remove(&self, artifact: &Artifact) -> Result<(), RemovalError> {
        Ok(self.tasks.delete(&artifact.identifier).await?)
    }
}

/// One remover per artifact kind.
pub struct RemoverSet {
    paths: PathRemover,
    files: FileRemover,
    registry_keys: RegistryKeyRemover,
    startup_values: StartupValueRemover,
    services: ServiceRemover,
    tasks: TaskRemover,
}

impl RemoverSet {
    pub fn new(platform: &Platform) -> Self {
        Self {
            paths: PathRemover,
            files: FileRemover,
            registry_keys: RegistryKeyRemover::new(platform.registry.clone()),
            startup_values: StartupValueRemover::new(platform.registry.clone()),
            services: ServiceRemover::new(platform.services.clone()),
            tasks: TaskRemover::new(platform.tasks.clone()),
        }
    }

    pub fn for_kind(&self, kind: ArtifactKind) -> &dyn Remover {
        match kind {
            ArtifactKind::Directory | ArtifactKind::TempEntry => &self.paths,
            ArtifactKind::StartupFile => &self.files,
            ArtifactKind::RegistryKey => &self.registry_keys,
            ArtifactKind::StartupRegistryValue => &self.startup_values,
            ArtifactKind::Service => &self.services,
            ArtifactKind::ScheduledTask => &self.tasks,
        }
    }
}
