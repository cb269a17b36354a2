//! Command-backed facades for Windows.
//!
//! Each facade shells out to the stock OS tool and parses its text output.
//! The parsers are plain functions so they can be tested on any platform.
//!
//! | Facade | Tool | Enumeration |
//! |---|---|---|
//! | [`RegCommand`] | `reg.exe` | `reg query ROOT /s /k /f *` |
//! | [`ScCommand`] | `sc.exe` | `sc query type= service state= all` |
//! | [`SchtasksCommand`] | `schtasks.exe` | `schtasks /query /fo csv /nh` |

use super::{
    CommandOutput, CommandRunner, PlatformError, Registry, RegistryValue, ServiceControl,
    ServiceInfo, TaskInfo, TaskScheduler,
};
use async_trait::async_trait;
use indexmap::IndexSet;

const REG: &str = "reg.exe";
const SC: &str = "sc.exe";
const SCHTASKS: &str = "schtasks.exe";

/// `sc.exe` exit codes we classify.
const SC_ACCESS_DENIED: i32 = 5;
const SC_SERVICE_DOES_NOT_EXIST: i32 = 1060;
const SC_SERVICE_MARKED_FOR_DELETE: i32 = 1072;

/// Name `reg.exe` prints for a key's unnamed value.
const DEFAULT_VALUE_NAME: &str = "(Default)";

/// Expand a short hive prefix (`HKLM\...`) to the form `reg.exe` prints.
pub fn expand_hive(key: &str) -> String {
    let (hive, rest) = match key.find('\\') {
        Some(idx) => (&key[..idx], &key[idx..]),
        None => (key, ""),
    };
    let long = match hive.to_ascii_uppercase().as_str() {
        "HKLM" => "HKEY_LOCAL_MACHINE",
        "HKCU" => "HKEY_CURRENT_USER",
        "HKCR" => "HKEY_CLASSES_ROOT",
        "HKU" => "HKEY_USERS",
        "HKCC" => "HKEY_CURRENT_CONFIG",
        _ => return key.to_string(),
    };
    format!("{}{}", long, rest)
}

/// Key paths listed in `reg query` output, minus `root` itself.
pub fn parse_reg_keys(stdout: &str, root: &str) -> Vec<String> {
    let root = expand_hive(root).to_lowercase();
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| line.starts_with("HKEY_"))
        .filter(|line| line.to_lowercase() != root)
        .map(str::to_string)
        .collect()
}

/// Interpret a recursive `reg query ROOT /s /k` run.
///
/// A search that runs to the end prints a trailer even when some subtrees
/// were denied along the way. reg.exe can also stop at a denied subtree
/// without one; the keys listed up to that point are kept and the root only
/// fails when nothing was enumerated.
fn key_tree_from_output(
    root: &str,
    output: &CommandOutput,
) -> Result<Vec<String>, PlatformError> {
    let keys = parse_reg_keys(&output.stdout, root);
    if output.success() || output.stdout.contains("End of search") {
        return Ok(keys);
    }

    let error = classify_tool_failure(REG, root, output);
    if keys.is_empty() {
        return Err(error);
    }
    tracing::warn!(
        "Registry enumeration of {} stopped early ({}), keeping {} key(s)",
        root,
        error,
        keys.len()
    );
    Ok(keys)
}

/// Values listed directly under the first key of `reg query KEY` output.
///
/// Value lines are indented; key lines (the queried key and its subkeys)
/// are not.
pub fn parse_reg_values(stdout: &str) -> Vec<RegistryValue> {
    stdout
        .lines()
        .filter(|line| line.starts_with("    "))
        .filter_map(|line| {
            let mut parts = line.trim_start().splitn(3, "    ");
            let name = parts.next()?.to_string();
            let kind = parts.next()?.trim().to_string();
            if !kind.starts_with("REG_") {
                return None;
            }
            let data = parts.next().unwrap_or("").trim().to_string();
            Some(RegistryValue { name, kind, data })
        })
        .collect()
}

/// Services listed in `sc query` output.
pub fn parse_sc_services(stdout: &str) -> Vec<ServiceInfo> {
    let mut services = Vec::new();
    let mut current: Option<ServiceInfo> = None;

    for line in stdout.lines().map(str::trim) {
        if let Some(name) = line.strip_prefix("SERVICE_NAME:") {
            if let Some(done) = current.take() {
                services.push(done);
            }
            let name = name.trim().to_string();
            current = Some(ServiceInfo {
                display_name: name.clone(),
                name,
            });
        } else if let Some(display) = line.strip_prefix("DISPLAY_NAME:") {
            if let Some(service) = current.as_mut() {
                service.display_name = display.trim().to_string();
            }
        }
    }
    if let Some(done) = current {
        services.push(done);
    }

    services
}

/// Tasks listed in `schtasks /query /fo csv /nh` output.
///
/// Tasks with several triggers are listed once per trigger; duplicates are
/// dropped.
pub fn parse_schtasks_csv(stdout: &str) -> Vec<TaskInfo> {
    let mut seen = IndexSet::new();
    for line in stdout.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix('"') else {
            continue;
        };
        let Some(end) = rest.find('"') else {
            continue;
        };
        let path = &rest[..end];
        if path.starts_with('\\') {
            seen.insert(path.to_string());
        }
    }
    seen.iter().map(|path| TaskInfo::from_path(path)).collect()
}

/// Map a failed `reg.exe`/`schtasks.exe` call to an error.
fn classify_tool_failure(program: &str, target: &str, output: &CommandOutput) -> PlatformError {
    let message = output.message();
    let lowered = message.to_lowercase();
    if lowered.contains("access is denied") {
        PlatformError::AccessDenied(target.to_string())
    } else if lowered.contains("unable to find")
        || lowered.contains("cannot find")
        || lowered.contains("does not exist")
    {
        PlatformError::NotFound(target.to_string())
    } else {
        PlatformError::CommandFailed {
            program: program.to_string(),
            code: output.code,
            message,
        }
    }
}

/// Map a failed `sc.exe` call to an error using its exit code.
fn classify_sc_failure(target: &str, output: &CommandOutput) -> PlatformError {
    match output.code {
        Some(SC_ACCESS_DENIED) => PlatformError::AccessDenied(target.to_string()),
        Some(SC_SERVICE_DOES_NOT_EXIST) => PlatformError::NotFound(target.to_string()),
        code => PlatformError::CommandFailed {
            program: SC.to_string(),
            code,
            message: output.message(),
        },
    }
}

/// Registry facade over `reg.exe`.
pub struct RegCommand {
    runner: CommandRunner,
}

impl RegCommand {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Registry for RegCommand {
    async fn key_tree(&self, root: &str) -> Result<Vec<String>, PlatformError> {
        let output = self
            .runner
            .run(REG, &["query", root, "/s", "/k", "/f", "*"])
            .await?;

        key_tree_from_output(root, &output)
    }

    async fn values(&self, key: &str) -> Result<Vec<RegistryValue>, PlatformError> {
        let output = self.runner.run(REG, &["query", key]).await?;
        if output.success() {
            Ok(parse_reg_values(&output.stdout))
        } else {
            Err(classify_tool_failure(REG, key, &output))
        }
    }

    async fn delete_key(&self, key: &str) -> Result<(), PlatformError> {
        let output = self.runner.run(REG, &["delete", key, "/f"]).await?;
        if output.success() {
            Ok(())
        } else {
            Err(classify_tool_failure(REG, key, &output))
        }
    }

    async fn delete_value(&self, key: &str, name: &str) -> Result<(), PlatformError> {
        let output = if name == DEFAULT_VALUE_NAME {
            self.runner.run(REG, &["delete", key, "/ve", "/f"]).await?
        } else {
            self.runner.run(REG, &["delete", key, "/v", name, "/f"]).await?
        };
        if output.success() {
            Ok(())
        } else {
            Err(classify_tool_failure(REG, &format!("{}\\{}", key, name), &output))
        }
    }
}

/// Service facade over `sc.exe`.
pub struct ScCommand {
    runner: CommandRunner,
}

impl ScCommand {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ServiceControl for ScCommand {
    async fn list(&self) -> Result<Vec<ServiceInfo>, PlatformError> {
        let output = self
            .runner
            .run(SC, &["query", "type=", "service", "state=", "all"])
            .await?;
        if output.success() {
            Ok(parse_sc_services(&output.stdout))
        } else {
            Err(classify_sc_failure("service list", &output))
        }
    }

    async fn stop(&self, name: &str) -> Result<(), PlatformError> {
        let output = self.runner.run(SC, &["stop", name]).await?;
        if output.success() {
            Ok(())
        } else {
            Err(classify_sc_failure(name, &output))
        }
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        let output = self.runner.run(SC, &["delete", name]).await?;
        match output.code {
            Some(0) => Ok(()),
            // Already pending removal; it goes away once its handles close.
            Some(SC_SERVICE_MARKED_FOR_DELETE) => {
                tracing::debug!("Service {} already marked for deletion", name);
                Ok(())
            }
            _ => Err(classify_sc_failure(name, &output)),
        }
    }
}

/// Task scheduler facade over `schtasks.exe`.
pub struct SchtasksCommand {
    runner: CommandRunner,
}

impl SchtasksCommand {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TaskScheduler for SchtasksCommand {
    async fn list(&self) -> Result<Vec<TaskInfo>, PlatformError> {
        let output = self
            .runner
            .run(SCHTASKS, &["/query", "/fo", "csv", "/nh"])
            .await?;
        if output.success() {
            Ok(parse_schtasks_csv(&output.stdout))
        } else {
            Err(classify_tool_failure(SCHTASKS, "task list", &output))
        }
    }

    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        let output = self
            .runner
            .run(SCHTASKS, &["/delete", "/tn", path, "/f"])
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(classify_tool_failure(SCHTASKS, path, &output))
        }
    }
}

/// Inert facade for targets without a registry, SCM or task scheduler.
pub struct Unsupported;

#[async_trait]
impl Registry for Unsupported {
    async fn key_tree(&self, _root: &str) -> Result<Vec<String>, PlatformError> {
        Ok(Vec::new())
    }

    async fn values(&self, _key: &str) -> Result<Vec<RegistryValue>, PlatformError> {
        Ok(Vec::new())
    }

    async fn delete_key(&self, _key: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("registry"))
    }

    async fn delete_value(&self, _key: &str, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("registry"))
    }
}

#[async_trait]
impl ServiceControl for Unsupported {
    async fn list(&self) -> Result<Vec<ServiceInfo>, PlatformError> {
        Ok(Vec::new())
    }

    async fn stop(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("service control"))
    }

    async fn delete(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("service control"))
    }
}

#[async_trait]
impl TaskScheduler for Unsupported {
    async fn list(&self) -> Result<Vec<TaskInfo>, PlatformError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _path: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("task scheduler"))
    }
}
