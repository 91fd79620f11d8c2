//! Running ffmpeg and ffprobe as child processes.
//!
//! Failures come back as a [`ToolFailure`] so each caller decides what a
//! failed run means: an unreadable upload for ffprobe, a failed variant for
//! ffmpeg, or a missing binary for either.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// ffmpeg explains a failure in its last few stderr lines.
const STDERR_TAIL_LINES: usize = 12;

/// Captured output of a run that exited successfully.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why a tool run did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum ToolFailure {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Non-zero exit. `stderr` holds only the tail of the output.
    #[error("exited with {status}: {stderr}")]
    Exited { status: ExitStatus, stderr: String },

    #[error("failed while waiting: {0}")]
    Wait(#[source] std::io::Error),
}

impl ToolFailure {
    /// The binary never ran, so the input was never looked at.
    pub fn is_spawn(&self) -> bool {
        matches!(self, Self::Spawn(_))
    }
}

/// One invocation of an external binary. The child is killed when the run
/// times out or its future is dropped.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    /// File name of `program`, for logs and errors.
    name: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .unwrap_or(program.as_os_str())
            .to_string_lossy()
            .into_owned();
        Self {
            program,
            name,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run to completion with stdin closed, capturing stdout and stderr.
    pub async fn execute(&self) -> Result<ToolOutput, ToolFailure> {
        tracing::debug!(tool = %self.name, args = ?self.args, "Spawning tool");
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ToolFailure::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolFailure::TimedOut(self.timeout))?
            .map_err(ToolFailure::Wait)?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ToolFailure::Exited {
                status: output.status,
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }
        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
