use super::CommandRunner;

/// Whether the current process runs with administrator rights.
///
/// On Windows `net session` only succeeds from an elevated process. On Unix
/// the effective uid must be root.
pub async fn is_elevated(runner: &CommandRunner) -> bool {
    if cfg!(target_os = "windows") {
        match runner.run("net.exe", &["session"]).await {
            Ok(output) => output.success(),
            Err(e) => {
                tracing::warn!("Could not determine elevation: {}", e);
                false
            }
        }
    } else {
        effective_uid_is_root()
    }
}

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}
