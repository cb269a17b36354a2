//! In-memory facades.
//!
//! These behave like the OS facades they stand in for (deletions really
//! remove entries, missing targets report `NotFound`) and let callers
//! inject access-denied failures per target. Every mutating call is
//! logged so tests can assert on call order.

use super::{
    Platform, PlatformError, Registry, RegistryValue, ServiceControl, ServiceInfo, TaskInfo,
    TaskScheduler,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn is_under(path: &str, ancestor: &str) -> bool {
    let path = path.to_lowercase();
    let ancestor = ancestor.to_lowercase();
    path == ancestor || path.starts_with(&format!("{}\\", ancestor))
}

/// In-memory registry: key paths mapped to their values.
#[derive(Default)]
pub struct MemoryRegistry {
    keys: Mutex<IndexMap<String, Vec<RegistryValue>>>,
    denied: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key (and, implicitly, nothing else; parents are not created).
    pub fn add_key(&self, path: &str) {
        self.keys
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default();
    }

    pub fn add_value(&self, key: &str, name: &str, data: &str) {
        self.keys
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(RegistryValue {
                name: name.to_string(),
                kind: "REG_SZ".to_string(),
                data: data.to_string(),
            });
    }

    /// Deny access to `path` and everything below it.
    pub fn deny(&self, path: &str) {
        self.denied.lock().unwrap().push(path.to_string());
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.keys
            .lock()
            .unwrap()
            .keys()
            .any(|k| k.eq_ignore_ascii_case(path))
    }

    pub fn value_names(&self, key: &str) -> Vec<String> {
        self.keys
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Mutating calls in the order they were made.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn is_denied(&self, path: &str) -> bool {
        self.denied
            .lock()
            .unwrap()
            .iter()
            .any(|denied| is_under(path, denied))
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn key_tree(&self, root: &str) -> Result<Vec<String>, PlatformError> {
        if self.is_denied(root) {
            return Err(PlatformError::AccessDenied(root.to_string()));
        }
        let keys = self.keys.lock().unwrap();
        if !keys.keys().any(|k| is_under(k, root)) {
            return Err(PlatformError::NotFound(root.to_string()));
        }
        Ok(keys
            .keys()
            .filter(|k| is_under(k, root) && !k.eq_ignore_ascii_case(root))
            .filter(|k| !self.is_denied(k))
            .cloned()
            .collect())
    }

    async fn values(&self, key: &str) -> Result<Vec<RegistryValue>, PlatformError> {
        if self.is_denied(key) {
            return Err(PlatformError::AccessDenied(key.to_string()));
        }
        self.keys
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.clone())
            .ok_or_else(|| PlatformError::NotFound(key.to_string()))
    }

    async fn delete_key(&self, key: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("delete_key:{}", key));
        if self.is_denied(key) {
            return Err(PlatformError::AccessDenied(key.to_string()));
        }
        let mut keys = self.keys.lock().unwrap();
        let before = keys.len();
        keys.retain(|k, _| !is_under(k, key));
        if keys.len() == before {
            return Err(PlatformError::NotFound(key.to_string()));
        }
        Ok(())
    }

    async fn delete_value(&self, key: &str, name: &str) -> Result<(), PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete_value:{}:{}", key, name));
        if self.is_denied(key) {
            return Err(PlatformError::AccessDenied(key.to_string()));
        }
        let mut keys = self.keys.lock().unwrap();
        let values = keys
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values)
            .ok_or_else(|| PlatformError::NotFound(key.to_string()))?;
        let before = values.len();
        values.retain(|v| !v.name.eq_ignore_ascii_case(name));
        if values.len() == before {
            return Err(PlatformError::NotFound(format!("{}\\{}", key, name)));
        }
        Ok(())
    }
}

/// In-memory service control manager.
#[derive(Default)]
pub struct MemoryServices {
    services: Mutex<Vec<ServiceInfo>>,
    failing_stops: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, display_name: &str) {
        self.services.lock().unwrap().push(ServiceInfo {
            name: name.to_string(),
            display_name: display_name.to_string(),
        });
    }

    pub fn fail_stop(&self, name: &str) {
        self.failing_stops.lock().unwrap().insert(name.to_lowercase());
    }

    pub fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_lowercase());
    }

    pub fn names(&self) -> Vec<String> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Mutating calls in the order they were made, as `stop:NAME` / `delete:NAME`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn exists(&self, name: &str) -> bool {
        self.services
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
    }
}

#[async_trait]
impl ServiceControl for MemoryServices {
    async fn list(&self) -> Result<Vec<ServiceInfo>, PlatformError> {
        Ok(self.services.lock().unwrap().clone())
    }

    async fn stop(&self, name: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("stop:{}", name));
        if !self.exists(name) {
            return Err(PlatformError::NotFound(name.to_string()));
        }
        if self.failing_stops.lock().unwrap().contains(&name.to_lowercase()) {
            return Err(PlatformError::AccessDenied(name.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("delete:{}", name));
        if !self.exists(name) {
            return Err(PlatformError::NotFound(name.to_string()));
        }
        if self.failing_deletes.lock().unwrap().contains(&name.to_lowercase()) {
            return Err(PlatformError::AccessDenied(name.to_string()));
        }
        self.services
            .lock()
            .unwrap()
            .retain(|s| !s.name.eq_ignore_ascii_case(name));
        Ok(())
    }
}

/// In-memory task scheduler.
#[derive(Default)]
pub struct MemoryTasks {
    tasks: Mutex<Vec<TaskInfo>>,
    failing_deletes: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task by its full path, e.g. `\Adobe\AdobeGCInvoker-1.0`.
    pub fn add(&self, path: &str) {
        self.tasks.lock().unwrap().push(TaskInfo::from_path(path));
    }

    pub fn fail_delete(&self, path: &str) {
        self.failing_deletes.lock().unwrap().insert(path.to_lowercase());
    }

    pub fn paths(&self) -> Vec<String> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.path.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskScheduler for MemoryTasks {
    async fn list(&self) -> Result<Vec<TaskInfo>, PlatformError> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(format!("delete:{}", path));
        if self.failing_deletes.lock().unwrap().contains(&path.to_lowercase()) {
            return Err(PlatformError::AccessDenied(path.to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| !t.path.eq_ignore_ascii_case(path));
        if tasks.len() == before {
            return Err(PlatformError::NotFound(path.to_string()));
        }
        Ok(())
    }
}

/// A full set of in-memory facades sharing state with the returned [`Platform`].
#[derive(Default, Clone)]
pub struct MemoryPlatform {
    pub registry: Arc<MemoryRegistry>,
    pub services: Arc<MemoryServices>,
    pub tasks: Arc<MemoryTasks>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(&self) -> Platform {
        Platform::new(
            self.registry.clone(),
            self.services.clone(),
            self.tasks.clone(),
        )
    }
}
