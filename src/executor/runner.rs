//! External command execution
//!
//! Every call site depends on [`CommandRunner`]; [`ProcessRunner`] spawns real
//! processes and [`ScriptedRunner`] answers from a closure.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::types::{MendError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr if present, stdout otherwise
    pub fn diagnostic_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line in `cwd`.
    ///
    /// A non-zero exit is a normal `Ok` result. Exceeding `limit` yields
    /// `MendError::Timeout` and the child is killed.
    async fn run(&self, command: &str, cwd: &Path, limit: Duration) -> Result<CommandOutput>;
}

/// Spawns commands through the platform shell
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn shell(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, cwd: &Path, limit: Duration) -> Result<CommandOutput> {
        let start = Instant::now();
        debug!("Running `{}` in {} (timeout {:?})", command, cwd.display(), limit);

        let mut cmd = Self::shell(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| MendError::Command {
            command: command.to_string(),
            message: format!("failed to spawn: {}", e),
        })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| MendError::timeout(command, limit))?
            .map_err(|e| MendError::Command {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}

type Script = dyn Fn(&str, &Path) -> Result<CommandOutput> + Send + Sync;

/// Answers commands from a closure and records every call
pub struct ScriptedRunner {
    script: Box<Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &Path) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command succeeds with empty output
    pub fn always_ok() -> Self {
        Self::new(|_, _| Ok(CommandOutput::ok("")))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == command).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, cwd: &Path, _limit: Duration) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command.to_string());
        (self.script)(command, cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let temp = TempDir::new().unwrap();
        let out = ProcessRunner
            .run("echo hello; echo oops >&2; exit 3", temp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.diagnostic_text().trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let temp = TempDir::new().unwrap();
        let err = ProcessRunner
            .run("sleep 5", temp.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, MendError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_uses_cwd() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();
        let out = ProcessRunner
            .run("ls", temp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(out.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_scripted_runner_records_calls() {
        let runner = ScriptedRunner::new(|cmd, _| {
            if cmd == "build" {
                Ok(CommandOutput::ok("built"))
            } else {
                Ok(CommandOutput::failed(1, "nope"))
            }
        });
        let cwd = Path::new(".");
        let limit = Duration::from_secs(1);
        assert!(runner.run("build", cwd, limit).await.unwrap().success());
        assert!(!runner.run("test", cwd, limit).await.unwrap().success());
        assert_eq!(runner.calls(), vec!["build".to_string(), "test".to_string()]);
        assert_eq!(runner.call_count("build"), 1);
    }
}
