//! OS facades consumed by the pipeline.
//!
//! The registry, the service control manager and the task scheduler are
//! reached through the [`Registry`], [`ServiceControl`] and [`TaskScheduler`]
//! traits so the pipeline never talks to the OS directly:
//!
//! - [`commands`]: Windows implementations driving `reg.exe`, `sc.exe` and
//!   `schtasks.exe` through a timeout-bounded [`CommandRunner`]
//! - [`memory`]: in-memory implementations with failure injection, used by
//!   tests and dry scenarios
//! - [`Platform::native`]: picks the right set for the current target
//!
//! Filesystem artifacts (directories, temp entries, startup files) are
//! handled with `std::fs` directly and need no facade.

pub mod command;
pub mod commands;
pub mod memory;
pub mod paths;
pub mod privilege;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use command::{CommandOutput, CommandRunner};
pub use paths::PathResolver;
pub use privilege::is_elevated;

/// Errors raised by OS facades.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{program} exited with status {code:?}: {message}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        message: String,
    },

    #[error("{0} timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("{0} is not available on this platform")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        match self {
            PlatformError::NotFound(_) => true,
            PlatformError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A named value under a registry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    pub name: String,
    pub kind: String,
    pub data: String,
}

/// An installed OS service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub display_name: String,
}

/// A registered scheduled task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Full task path, e.g. `\Adobe\AdobeGCInvoker-1.0`.
    pub path: String,
    pub name: String,
    pub folder: String,
}

impl TaskInfo {
    /// Split a full task path into folder and leaf name.
    pub fn from_path(path: &str) -> Self {
        let (folder, name) = match path.rfind('\\') {
            Some(idx) => (&path[..=idx], &path[idx + 1..]),
            None => ("\\", path),
        };
        Self {
            path: path.to_string(),
            name: name.to_string(),
            folder: folder.to_string(),
        }
    }
}

/// Registry access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Every key below `root` (full paths, `root` itself excluded).
    ///
    /// Subtrees that cannot be read are left out; an unreadable `root` is
    /// an error.
    async fn key_tree(&self, root: &str) -> Result<Vec<String>, PlatformError>;

    /// Values directly under `key`.
    async fn values(&self, key: &str) -> Result<Vec<RegistryValue>, PlatformError>;

    /// Delete `key` and everything below it.
    async fn delete_key(&self, key: &str) -> Result<(), PlatformError>;

    /// Delete a single named value, leaving the key in place.
    async fn delete_value(&self, key: &str, name: &str) -> Result<(), PlatformError>;
}

/// Service control manager access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn list(&self) -> Result<Vec<ServiceInfo>, PlatformError>;
    async fn stop(&self, name: &str) -> Result<(), PlatformError>;
    async fn delete(&self, name: &str) -> Result<(), PlatformError>;
}

/// Task scheduler access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn list(&self) -> Result<Vec<TaskInfo>, PlatformError>;
    async fn delete(&self, path: &str) -> Result<(), PlatformError>;
}

/// The set of facades one run works against.
#[derive(Clone)]
pub struct Platform {
    pub registry: Arc<dyn Registry>,
    pub services: Arc<dyn ServiceControl>,
    pub tasks: Arc<dyn TaskScheduler>,
}

impl Platform {
    pub fn new(
        registry: Arc<dyn Registry>,
        services: Arc<dyn ServiceControl>,
        tasks: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            registry,
            services,
            tasks,
        }
    }

    /// Facades for the current target.
    ///
    /// Windows gets the command-backed implementations; other targets get
    /// inert ones that find nothing.
    pub fn native(runner: CommandRunner) -> Self {
        if cfg!(target_os = "windows") {
            Self::new(
                Arc::new(commands::RegCommand::new(runner.clone())),
                Arc::new(commands::ScCommand::new(runner.clone())),
                Arc::new(commands::SchtasksCommand::new(runner)),
            )
        } else {
            tracing::debug!("Registry, services and tasks unavailable on this platform");
            Self::new(
                Arc::new(commands::Unsupported),
                Arc::new(commands::Unsupported),
                Arc::new(commands::Unsupported),
            )
        }
    }
}
