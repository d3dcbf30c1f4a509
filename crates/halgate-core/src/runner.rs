//! Native tool execution with a hard per-invocation timeout.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::metrics::METRICS;

/// Upper bound on any single tool invocation.
pub const MAX_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Captured output of a tool that ran to completion.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ToolOutput {
    /// Whether the tool exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// What happened when a tool was invoked.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Completed(ToolOutput),
    TimedOut { limit: Duration },
    SpawnFailed { reason: String },
}

/// Runs native validators as subprocesses.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(MAX_TOOL_TIMEOUT)
    }
}

impl ToolRunner {
    /// Create a runner; the timeout is capped at [`MAX_TOOL_TIMEOUT`].
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: timeout.min(MAX_TOOL_TIMEOUT),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` with `args`, never returning an error.
    ///
    /// The child is killed if it outlives the timeout.
    pub async fn run(&self, program: &Path, args: &[OsString]) -> ToolOutcome {
        let start = Instant::now();
        METRICS.inc_native_runs();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %program.display(), error = %e, "failed to spawn tool");
                return ToolOutcome::SpawnFailed {
                    reason: format!("failed to run {}: {}", program.display(), e),
                };
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ToolOutcome::SpawnFailed {
                    reason: format!("failed to collect output of {}: {}", program.display(), e),
                };
            }
            Err(_elapsed) => {
                METRICS.inc_timeouts();
                tracing::warn!(
                    program = %program.display(),
                    limit_secs = self.timeout.as_secs_f64(),
                    "tool timed out"
                );
                return ToolOutcome::TimedOut {
                    limit: self.timeout,
                };
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(program = %program.display(), exit_code, duration_ms, "tool finished");

        ToolOutcome::Completed(ToolOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        })
    }
}

/// Write `content` to a fresh temp file whose name ends in `suffix`.
///
/// The file is removed when the handle drops.
pub fn scratch_source(content: &str, suffix: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("halgate-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_capped() {
        let runner = ToolRunner::new(Duration::from_secs(600));
        assert_eq!(runner.timeout(), MAX_TOOL_TIMEOUT);
        let runner = ToolRunner::new(Duration::from_secs(5));
        assert_eq!(runner.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_tool_output_helpers() {
        let out = ToolOutput {
            exit_code: 0,
            stdout: "a\n".to_string(),
            stderr: "b\n".to_string(),
            duration_ms: 3,
        };
        assert!(out.succeeded());
        assert_eq!(out.combined(), "a\nb\n");
    }

    #[test]
    fn test_scratch_source_keeps_suffix_and_content() {
        let file = scratch_source("int x;", ".cpp").unwrap();
        assert!(file.path().to_string_lossy().ends_with(".cpp"));
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "int x;");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_simple_command() {
        let runner = ToolRunner::new(Duration::from_secs(10));
        let outcome = runner
            .run(Path::new("echo"), &[OsString::from("hello")])
            .await;
        match outcome {
            ToolOutcome::Completed(out) => {
                assert!(out.succeeded());
                assert!(out.stdout.contains("hello"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_failing_command() {
        let runner = ToolRunner::default();
        match runner.run(Path::new("false"), &[]).await {
            ToolOutcome::Completed(out) => assert!(!out.succeeded()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let runner = ToolRunner::default();
        let outcome = runner
            .run(Path::new("/nonexistent/halgate-no-such-tool"), &[])
            .await;
        assert!(matches!(outcome, ToolOutcome::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let runner = ToolRunner::new(Duration::from_millis(200));
        let outcome = runner.run(Path::new("sleep"), &[OsString::from("5")]).await;
        assert!(matches!(outcome, ToolOutcome::TimedOut { .. }));
    }
}
