//! Script Runners
//!
//! A runner executes (or simulates) a remediation script and reports the raw
//! outcome. It never decides whether a script may run; that happens before a
//! runner is reached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempPath;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};
use triage_core::ScriptLanguage;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to prepare script file: {0}")]
    Prepare(#[from] std::io::Error),

    #[error("Failed to start {interpreter}: {reason}")]
    Spawn { interpreter: String, reason: String },

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Raw result of a single script run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub output: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// Pluggable execution backend
#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, script: &str, language: ScriptLanguage) -> Result<RunOutcome>;
}

const POWERSHELL_SIMULATION: &str = "Starting disk cleanup on C:\\
Target: IIS logs older than 30 days
Found 247 files totaling 12.3 GB
Created backup directory: D:\\Backups\\IISLogs
Creating backup...
Deleting old logs...
Cleanup complete. Space freed: 12.3 GB
Current disk usage: 42%
SUCCESS: Disk usage now within acceptable range";

const BASH_SIMULATION: &str = "Checking disk usage...
Cleaning /tmp directory
Removed 5.2 GB of temporary files
Disk usage: 38%
Cleanup complete";

/// Demo backend: canned narrative output, touches no process or file.
#[derive(Debug, Default, Clone)]
pub struct SimulatedRunner;

impl SimulatedRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runner for SimulatedRunner {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn run(&self, _script: &str, language: ScriptLanguage) -> Result<RunOutcome> {
        let start = Instant::now();
        let output = match language {
            ScriptLanguage::Powershell => POWERSHELL_SIMULATION,
            ScriptLanguage::Bash => BASH_SIMULATION,
        };

        info!(language = %language, "Simulating script execution");

        Ok(RunOutcome {
            status: RunStatus::Success,
            output: output.to_string(),
            exit_code: 0,
            elapsed: start.elapsed(),
        })
    }
}

/// Real backend: runs the script through its interpreter in a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    powershell_bin: String,
    bash_bin: String,
    /// Where transient script files go; the system temp dir when unset
    script_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            powershell_bin: "powershell".to_string(),
            bash_bin: "bash".to_string(),
            script_dir: None,
        }
    }

    pub fn with_interpreters(mut self, powershell_bin: impl Into<String>, bash_bin: impl Into<String>) -> Self {
        self.powershell_bin = powershell_bin.into();
        self.bash_bin = bash_bin.into();
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    fn command(&self, language: ScriptLanguage, path: &Path) -> Command {
        match language {
            ScriptLanguage::Powershell => {
                let mut cmd = Command::new(&self.powershell_bin);
                cmd.args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"])
                    .arg(path);
                cmd
            }
            ScriptLanguage::Bash => {
                let mut cmd = Command::new(&self.bash_bin);
                cmd.arg(path);
                cmd
            }
        }
    }

    fn interpreter(&self, language: ScriptLanguage) -> &str {
        match language {
            ScriptLanguage::Powershell => &self.powershell_bin,
            ScriptLanguage::Bash => &self.bash_bin,
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Write the script to a transient file. The file is removed when the
/// returned path is dropped.
fn write_script(script: &str, language: ScriptLanguage, dir: Option<&Path>) -> Result<TempPath> {
    let suffix = format!(".{}", language.extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix("remediation-").suffix(&suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

#[async_trait]
impl Runner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, script: &str, language: ScriptLanguage) -> Result<RunOutcome> {
        let start = Instant::now();
        let script_path = write_script(script, language, self.script_dir.as_deref())?;

        let child = self
            .command(language, &script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                interpreter: self.interpreter(language).to_string(),
                reason: e.to_string(),
            })?;

        info!(language = %language, timeout_secs = self.timeout.as_secs(), "Executing script");

        // Dropping the child on timeout kills it.
        let outcome = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                let exit_code = output.status.code().unwrap_or(-1);
                RunOutcome {
                    status: if output.status.success() {
                        RunStatus::Success
                    } else {
                        RunStatus::Failed
                    },
                    output: combined,
                    exit_code,
                    elapsed: start.elapsed(),
                }
            }
            Ok(Err(e)) => return Err(RunnerError::Execution(e.to_string())),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Script execution timed out");
                RunOutcome {
                    status: RunStatus::Failed,
                    output: format!(
                        "Script execution timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                    exit_code: -1,
                    elapsed: start.elapsed(),
                }
            }
        };

        drop(script_path);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_runner_is_language_specific() {
        let runner = SimulatedRunner::new();

        let ps = runner.run("Write-Output hi", ScriptLanguage::Powershell).await.unwrap();
        assert_eq!(ps.status, RunStatus::Success);
        assert_eq!(ps.exit_code, 0);
        assert!(ps.output.contains("D:\\Backups\\IISLogs"));

        let sh = runner.run("df -h", ScriptLanguage::Bash).await.unwrap();
        assert!(sh.output.contains("Cleaning /tmp directory"));
    }

    #[test]
    fn test_script_file_removed_on_drop() {
        let path = write_script("echo hi", ScriptLanguage::Bash, None).unwrap();
        let owned = path.to_path_buf();
        assert!(owned.exists());
        assert_eq!(owned.extension().and_then(|e| e.to_str()), Some("sh"));
        drop(path);
        assert!(!owned.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output_and_cleans_up() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let outcome = runner
            .run("echo \"$0\"\necho warn >&2", ScriptLanguage::Bash)
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.output.contains("warn"));

        let script_path = outcome.output.lines().next().unwrap().trim().to_string();
        assert!(script_path.ends_with(".sh"));
        assert!(!Path::new(&script_path).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_reports_nonzero_exit() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let outcome = runner
            .run("echo disk still full >&2\nexit 3", ScriptLanguage::Bash)
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.output.contains("disk still full"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout_is_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("script-path");
        let runner = ProcessRunner::new(Duration::from_secs(1)).with_script_dir(dir.path());

        let script = format!("echo \"$0\" > '{}'\nsleep 10", marker.display());
        let outcome = runner.run(&script, ScriptLanguage::Bash).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(outcome.output, "Script execution timed out after 1 seconds");
        assert!(outcome.elapsed < Duration::from_secs(10));

        let script_path = std::fs::read_to_string(&marker).unwrap();
        let script_path = script_path.trim();
        assert!(script_path.ends_with(".sh"));
        assert!(!Path::new(script_path).exists());
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(1))
            .with_interpreters("/nonexistent/pwsh", "/nonexistent/bash")
            .with_script_dir(dir.path());
        let err = runner.run("echo hi", ScriptLanguage::Bash).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));

        // script file removed even though nothing ran
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
