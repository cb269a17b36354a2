use super::PlatformError;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Captured result of one OS tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr if it has anything to say, stdout otherwise.
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs OS tools with an upper bound on how long each call may take.
///
/// A child still running when the bound expires is killed.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit is not an error here; callers classify it.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PlatformError> {
        tracing::debug!("Executing: {} {}", program, args.join(" "));

        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                tracing::warn!("{} timed out after {:?}", program, self.timeout);
                PlatformError::Timeout(program.to_string(), self.timeout)
            })??;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            "{} completed in {:.2}s with exit code {:?}",
            program,
            start.elapsed().as_secs_f32(),
            result.code
        );

        Ok(result)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "partial\n".to_string(),
            stderr: "ERROR: Access is denied.\n".to_string(),
        };
        assert_eq!(output.message(), "ERROR: Access is denied.");
        assert!(!output.success());

        let quiet = CommandOutput {
            code: Some(1060),
            stdout: "[SC] OpenService FAILED 1060\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(quiet.message(), "[SC] OpenService FAILED 1060");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let output = runner.run("sh", &["-c", "echo hello; exit 3"]).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let runner = CommandRunner::new(Duration::from_millis(100));
        let result = runner.run("sleep", &["5"]).await;
        assert!(matches!(result, Err(PlatformError::Timeout(_, _))));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let runner = CommandRunner::default();
        let result = runner.run("definitely-not-a-real-program-xyz", &[]).await;
        assert!(matches!(result, Err(PlatformError::Io(_))));
    }
}
