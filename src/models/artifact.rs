use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata key holding the registry key a startup value lives under.
pub const META_KEY: &str = "key";

/// Metadata key holding the name of a startup registry value.
pub const META_VALUE_NAME: &str = "value_name";


/// The kinds of system objects the pipeline knows how to find and remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    Directory,
    RegistryKey,
    TempEntry,
    Service,
    ScheduledTask,
    StartupRegistryValue,
    StartupFile,
}

impl ArtifactKind {
    /// Report category the kind is grouped under.
    ///
    /// Both startup kinds share one category.
    pub fn category(self) -> &'static str {
        match self {
            ArtifactKind::Directory => "Directories",
            ArtifactKind::RegistryKey => "RegistryKeys",
            ArtifactKind::TempEntry => "TempFiles",
            ArtifactKind::Service => "Services",
            ArtifactKind::ScheduledTask => "ScheduledTasks",
            ArtifactKind::StartupRegistryValue | ArtifactKind::StartupFile => "StartupEntries",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Directory => "directory",
            ArtifactKind::RegistryKey => "registry key",
            ArtifactKind::TempEntry => "temp entry",
            ArtifactKind::Service => "service",
            ArtifactKind::ScheduledTask => "scheduled task",
            ArtifactKind::StartupRegistryValue => "startup value",
            ArtifactKind::StartupFile => "startup file",
        };
        f.write_str(label)
    }
}

/// A single discovered system object eligible for removal.
///
/// Identity is the `(kind, identifier)` pair. The identifier is the path,
/// key path or name the matching [`Remover`](crate::services::Remover)
/// acts on; anything else a remover needs travels in `metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub identifier: String,
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            display_name: None,
            metadata: IndexMap::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Look up a metadata entry.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Report category of this artifact.
    pub fn category(&self) -> &'static str {
        self.kind.category()
    }

    /// Case-insensitive identity used for de-duplication.
    ///
    /// Windows paths, registry keys, service and task names all compare
    /// case-insensitively.
    pub fn identity(&self) -> (ArtifactKind, String) {
        (self.kind, self.identifier.to_lowercase())
    }

    /// Human readable descriptor used in listings and reports.
    pub fn describe(&self) -> String {
        match &self.display_name {
            Some(display) if display != &self.identifier => {
                format!("{} ({})", self.identifier, display)
            }
            _ => self.identifier.clone(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
