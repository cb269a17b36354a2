//! Discovery adapters, one per artifact kind.
//!
//! Every source is side-effect free and can be invoked again for a fresh
//! scan. Absent locations are not errors. Unreadable parts of a location
//! (a denied registry subtree, one unreadable run key) are logged and
//! skipped so the rest of the scan still counts. A source only returns
//! [`SourceError`] when it could not enumerate anything at all.

use super::matching::MatchRule;
use crate::models::artifact::{META_KEY, META_VALUE_NAME};
use crate::models::{Artifact, ArtifactKind};
use crate::platform::{PlatformError, Registry, ServiceControl, TaskScheduler};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// A source failed as a whole.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to enumerate {what}: {source}")]
    Enumeration {
        what: String,
        #[source]
        source: PlatformError,
    },

    #[error("Failed to read {path}: {source}")]
    ReadDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Enumerates candidate artifacts of one kind.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError>;
}

/// Collapse a set of registry key paths to their top-most members.
///
/// Keys are de-duplicated case-insensitively and sorted; a key is dropped
/// when another retained key is a strict ancestor of it (path prefix
/// followed by a separator). `{A, A\B, A\B\C, D}` becomes `{A, D}`.
pub fn collapse_nested_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut sorted: Vec<String> = keys.into_iter().collect();
    sorted.sort_by_key(|k| k.to_lowercase());
    sorted.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

    let mut retained: Vec<String> = Vec::new();
    let mut prefixes: Vec<String> = Vec::new();
    for key in sorted {
        let lowered = key.to_lowercase();
        if prefixes.iter().any(|prefix| lowered.starts_with(prefix.as_str())) {
            continue;
        }
        prefixes.push(format!("{}\\", lowered));
        retained.push(key);
    }
    retained
}

fn leaf_name(key: &str) -> &str {
    key.rsplit('\\').next().unwrap_or(key)
}

/// Read the entries of `dir`, treating a missing directory as empty.
///
/// Entries whose names are not valid UTF-8 cannot carry a vendor term and
/// are skipped.
fn read_entries(dir: &Utf8Path) -> Result<Vec<(Utf8PathBuf, bool)>, io::Error> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", dir, e);
                continue;
            }
        };
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            tracing::debug!("Skipping non UTF-8 entry in {}", dir);
            continue;
        };
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        entries.push((path, is_file));
    }
    Ok(entries)
}

/// Fixed candidate directories; yields the ones that exist.
pub struct DirectorySource {
    candidates: Vec<Utf8PathBuf>,
}

impl DirectorySource {
    pub fn new(candidates: Vec<Utf8PathBuf>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl ArtifactSource for DirectorySource {
    fn name(&self) -> &str {
        "directories"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        Ok(self
            .candidates
            .iter()
            .filter(|path| path.exists())
            .map(|path| Artifact::new(ArtifactKind::Directory, path.as_str()))
            .collect())
    }
}

/// Immediate children of the temp directory whose names match.
pub struct TempEntrySource {
    temp_dir: Utf8PathBuf,
    rule: MatchRule,
}

impl TempEntrySource {
    pub fn new(temp_dir: Utf8PathBuf, rule: MatchRule) -> Self {
        Self { temp_dir, rule }
    }
}

#[async_trait]
impl ArtifactSource for TempEntrySource {
    fn name(&self) -> &str {
        "temp entries"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let entries = read_entries(&self.temp_dir).map_err(|source| SourceError::ReadDir {
            path: self.temp_dir.clone(),
            source,
        })?;

        Ok(entries
            .into_iter()
            .filter(|(path, _)| path.file_name().is_some_and(|n| self.rule.matches(n)))
            .map(|(path, _)| Artifact::new(ArtifactKind::TempEntry, path.as_str()))
            .collect())
    }
}

/// Registry keys below the configured roots whose leaf name matches.
pub struct RegistryKeySource {
    registry: Arc<dyn Registry>,
    roots: Vec<String>,
    rule: MatchRule,
}

impl RegistryKeySource {
    pub fn new(registry: Arc<dyn Registry>, roots: Vec<String>, rule: MatchRule) -> Self {
        Self {
            registry,
            roots,
            rule,
        }
    }
}

#[async_trait]
impl ArtifactSource for RegistryKeySource {
    fn name(&self) -> &str {
        "registry keys"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let mut matched = Vec::new();

        for root in &self.roots {
            match self.registry.key_tree(root).await {
                Ok(keys) => {
                    let before = matched.len();
                    matched.extend(keys.into_iter().filter(|k| self.rule.matches(leaf_name(k))));
                    tracing::debug!("{}: {} matching key(s)", root, matched.len() - before);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Registry root {} does not exist", root);
                }
                Err(e) => {
                    tracing::warn!("Skipping registry root {}: {}", root, e);
                }
            }
        }

        Ok(collapse_nested_keys(matched)
            .into_iter()
            .map(|key| Artifact::new(ArtifactKind::RegistryKey, key))
            .collect())
    }
}

/// Services whose short name or display name matches.
pub struct ServiceSource {
    services: Arc<dyn ServiceControl>,
    rule: MatchRule,
}

impl ServiceSource {
    pub fn new(services: Arc<dyn ServiceControl>, rule: MatchRule) -> Self {
        Self { services, rule }
    }
}

#[async_trait]
impl ArtifactSource for ServiceSource {
    fn name(&self) -> &str {
        "services"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let services = self
            .services
            .list()
            .await
            .map_err(|source| SourceError::Enumeration {
                what: "services".to_string(),
                source,
            })?;

        Ok(services
            .into_iter()
            .filter(|s| {
                self.rule
                    .matches_any([s.name.as_str(), s.display_name.as_str()])
            })
            .map(|s| Artifact::new(ArtifactKind::Service, s.name).with_display_name(s.display_name))
            .collect())
    }
}

/// Scheduled tasks whose name or folder path matches.
pub struct ScheduledTaskSource {
    tasks: Arc<dyn TaskScheduler>,
    rule: MatchRule,
}

impl ScheduledTaskSource {
    pub fn new(tasks: Arc<dyn TaskScheduler>, rule: MatchRule) -> Self {
        Self { tasks, rule }
    }
}

#[async_trait]
impl ArtifactSource for ScheduledTaskSource {
    fn name(&self) -> &str {
        "scheduled tasks"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let tasks = self
            .tasks
            .list()
            .await
            .map_err(|source| SourceError::Enumeration {
                what: "scheduled tasks".to_string(),
                source,
            })?;

        Ok(tasks
            .into_iter()
            .filter(|t| self.rule.matches_any([t.name.as_str(), t.path.as_str()]))
            .map(|t| Artifact::new(ArtifactKind::ScheduledTask, t.path).with_display_name(t.name))
            .collect())
    }
}

/// Auto-run registry values whose name OR data matches.
pub struct StartupValueSource {
    registry: Arc<dyn Registry>,
    run_keys: Vec<String>,
    rule: MatchRule,
}

impl StartupValueSource {
    pub fn new(registry: Arc<dyn Registry>, run_keys: Vec<String>, rule: MatchRule) -> Self {
        Self {
            registry,
            run_keys,
            rule,
        }
    }
}

#[async_trait]
impl ArtifactSource for StartupValueSource {
    fn name(&self) -> &str {
        "startup values"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let mut found = Vec::new();

        for key in &self.run_keys {
            let values = match self.registry.values(key).await {
                Ok(values) => values,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    tracing::warn!("Skipping run key {}: {}", key, e);
                    continue;
                }
            };

            found.extend(
                values
                    .into_iter()
                    .filter(|v| self.rule.matches_any([v.name.as_str(), v.data.as_str()]))
                    .map(|v| {
                        Artifact::new(
                            ArtifactKind::StartupRegistryValue,
                            format!("{}\\{}", key, v.name),
                        )
                        .with_display_name(v.data.clone())
                        .with_metadata(META_KEY, key.clone())
                        .with_metadata(META_VALUE_NAME, v.name)
                    }),
            );
        }

        Ok(found)
    }
}

/// Files in startup folders whose names match.
pub struct StartupFileSource {
    folders: Vec<Utf8PathBuf>,
    rule: MatchRule,
}

impl StartupFileSource {
    pub fn new(folders: Vec<Utf8PathBuf>, rule: MatchRule) -> Self {
        Self { folders, rule }
    }
}

#[async_trait]
impl ArtifactSource for StartupFileSource {
    fn name(&self) -> &str {
        "startup files"
    }

    async fn discover(&self) -> Result<Vec<Artifact>, SourceError> {
        let mut found = Vec::new();

        for folder in &self.folders {
            let entries = match read_entries(folder) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Skipping startup folder {}: {}", folder, e);
                    continue;
                }
            };

            found.extend(
                entries
                    .into_iter()
                    .filter(|(path, is_file)| {
                        *is_file && path.file_name().is_some_and(|n| self.rule.matches(n))
                    })
                    .map(|(path, _)| Artifact::new(ArtifactKind::StartupFile, path.as_str())),
            );
        }

        Ok(found)
    }
}
