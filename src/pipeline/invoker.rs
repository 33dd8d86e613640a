use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::config::JobConfig;
use crate::error::{GapwatchError, Result};

/// How many trailing stderr lines are kept for the failure report.
const STDERR_TAIL_LINES: usize = 50;

/// Result of one external job invocation.
#[derive(Debug)]
pub struct ExitOutcome {
    /// Process exit code; `None` if the job was killed by a signal
    pub code: Option<i32>,
    /// Wall-clock duration of the invocation
    pub duration: Duration,
    /// Trailing stderr lines, attached to the failure report
    pub stderr_tail: Vec<String>,
}

impl ExitOutcome {
    /// Exit code 0 means the job succeeded.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Launches the external analysis job and streams its output.
#[derive(Debug, Clone)]
pub struct JobInvoker {
    config: JobConfig,
}

impl JobInvoker {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    /// Run the analysis job to completion in `working_dir`.
    ///
    /// stdout and stderr are forwarded to the log line-by-line as they
    /// arrive, so operators can follow long runs live. A nonzero exit is
    /// reported through the returned [`ExitOutcome`], not as an error; only
    /// a failure to launch the process at all is an `Err`. Failures are
    /// never retried here; the next input change triggers the next attempt.
    pub async fn invoke(&self, working_dir: &Path) -> Result<ExitOutcome> {
        let started = Instant::now();
        tracing::info!(
            command = %self.config.command,
            args = ?self.config.args,
            working_dir = %working_dir.display(),
            "Launching analysis job"
        );

        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| GapwatchError::Spawn {
            command: self.config.command.clone(),
            source,
        })?;

        let stdout_task = tokio::spawn(forward_lines(child.stdout.take(), StreamKind::Stdout));
        let stderr_task = tokio::spawn(forward_lines(child.stderr.take(), StreamKind::Stderr));

        let status = child.wait().await?;
        let _ = stdout_task.await;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        let outcome = ExitOutcome {
            code: status.code(),
            duration: started.elapsed(),
            stderr_tail,
        };

        if outcome.success() {
            tracing::info!(
                duration_ms = outcome.duration.as_millis() as u64,
                "Analysis job completed"
            );
        } else {
            tracing::error!(
                exit_code = ?outcome.code,
                duration_ms = outcome.duration.as_millis() as u64,
                stderr = %outcome.stderr_tail.join("\n"),
                "Analysis job failed"
            );
        }

        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Forward a child stream to the log line-by-line.
///
/// Returns the trailing stderr lines so a failure report can carry them;
/// stdout returns empty.
async fn forward_lines<R>(stream: Option<R>, kind: StreamKind) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Vec::new();
    };
    let mut lines = BufReader::new(stream).lines();
    let mut tail: VecDeque<String> = VecDeque::new();

    while let Ok(Some(line)) = lines.next_line().await {
        match kind {
            StreamKind::Stdout => {
                tracing::info!(stream = "stdout", "{}", line);
            }
            StreamKind::Stderr => {
                tracing::warn!(stream = "stderr", "{}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
    }

    tail.into()
}
