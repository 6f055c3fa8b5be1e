use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::unbounded_channel;
use tracing::debug;

use crate::error::RunnerError;
use crate::progress::{CancelFlag, ProgressSink};

/// How long a graceful termination request may take before the monitor
/// escalates to a forced kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Substrings of converter stdout that let the monitor infer progress.
///
/// The converter prints no structured progress, so this is a heuristic
/// lower bound: fixed needles mapped to fixed percentages, matched
/// case-insensitively. The [`ProgressSink`] floor keeps the sequence
/// monotonic no matter what order lines arrive in. Deliberately a single
/// flat table — do not tune without representative output traces.
const PROGRESS_NEEDLES: [(&str, u8, &str); 5] = [
    ("extracting", 30, "Extracting files..."),
    ("creating", 40, "Creating archive..."),
    ("processing", 50, "Processing files..."),
    ("completed", 90, "Nearly complete..."),
    ("success", 90, "Nearly complete..."),
];

/// Terminal state of a monitored child process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Exit code 0.
    Completed,
    /// Nonzero exit code.
    Failed,
    /// Cooperative cancellation was observed and the child terminated.
    Cancelled,
    /// The invocation deadline elapsed and the child terminated.
    TimedOut,
    /// The child survived both the graceful request and the forced kill
    /// within the grace period. The process may still be running.
    KilledAfterTimeout,
}

/// Everything a finished (or abandoned) child process left behind.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// One-line result text: stdout on success, the error text otherwise.
    #[must_use]
    pub fn output(&self) -> &str {
        match self.status {
            RunStatus::Completed => &self.stdout,
            RunStatus::Failed => {
                if self.stderr.is_empty() {
                    "Unknown error"
                } else {
                    &self.stderr
                }
            }
            RunStatus::Cancelled => "cancelled",
            RunStatus::TimedOut => "timeout",
            RunStatus::KilledAfterTimeout => "killed after timeout",
        }
    }

    /// Both streams, for the multi-line failure detail blob.
    #[must_use]
    pub fn merged(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Spawns a child process and watches it to completion: concurrent
/// stdout/stderr capture, heuristic progress, a hard deadline, and
/// cooperative cancellation with graceful-then-forced termination.
///
/// ```text
///            ┌──────────── ProcessMonitor::run ────────────┐
///  argv ────▶│ spawn ─▶ read lines ─▶ infer progress       │──▶ RunOutcome
///  env  ────▶│            │                                │
///            │            ├── deadline elapsed ──▶ kill    │
///            │            └── cancel observed  ──▶ kill    │
///            └─────────────────────────────────────────────┘
/// ```
///
/// The monitor never turns process-level failure into `Err` — every
/// started invocation produces a [`RunOutcome`]. `Err` means the process
/// could not be spawned.
#[derive(Debug)]
pub struct ProcessMonitor {
    grace: Duration,
}

enum StreamKind {
    Stdout,
    Stderr,
}

/// How a termination request ended.
enum Terminated {
    Exited,
    Unresponsive,
}

impl ProcessMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self { grace: KILL_GRACE }
    }

    /// Override the kill grace period. Floor of 5 seconds in production;
    /// tests shrink it to keep cancellation cases fast.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run `program` with `args` and `envs`, streaming output until exit,
    /// deadline, or cancellation.
    ///
    /// # Errors
    ///
    /// [`RunnerError::Spawn`] if the child cannot be started, or
    /// [`RunnerError::Io`] if waiting on it fails at the OS level.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        deadline: Duration,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, RunnerError> {
        debug!(program, ?args, "spawning converter process");

        let mut child = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let (line_tx, mut line_rx) = unbounded_channel::<(StreamKind, String)>();
        if let Some(stdout) = child.stdout.take() {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send((StreamKind::Stdout, line)).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send((StreamKind::Stderr, line)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(line_tx);

        let mut stdout_lines: Vec<String> = Vec::new();
        let mut stderr_lines: Vec<String> = Vec::new();

        let timer = tokio::time::sleep(deadline);
        tokio::pin!(timer);

        // Phase 1: drain both pipes. The line channel closes when the
        // child closes its ends, which for the converter means exit is
        // imminent. Cancellation and the deadline interrupt the drain.
        let interrupted = loop {
            tokio::select! {
                received = line_rx.recv() => match received {
                    Some((StreamKind::Stdout, line)) => {
                        infer_progress(&line, progress);
                        stdout_lines.push(line);
                    }
                    Some((StreamKind::Stderr, line)) => stderr_lines.push(line),
                    None => break None,
                },
                () = cancel.cancelled() => break Some(RunStatus::Cancelled),
                () = &mut timer => break Some(RunStatus::TimedOut),
            }
        };

        if let Some(reason) = interrupted {
            debug!(program, ?reason, "terminating converter process");
            let terminated = self.terminate(&mut child).await;
            // Collect whatever output raced in before termination.
            while let Ok((kind, line)) = line_rx.try_recv() {
                match kind {
                    StreamKind::Stdout => stdout_lines.push(line),
                    StreamKind::Stderr => stderr_lines.push(line),
                }
            }
            let status = match terminated {
                Terminated::Exited => reason,
                Terminated::Unresponsive => RunStatus::KilledAfterTimeout,
            };
            let outcome = RunOutcome {
                status,
                stdout: stdout_lines.join("\n"),
                stderr: stderr_lines.join("\n"),
            };
            progress.done(false, outcome.output());
            return Ok(outcome);
        }

        // Phase 2: pipes are closed; the exit status should follow
        // promptly. A child that lingers past the grace period is
        // treated like a deadline overrun.
        let status = match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let terminated = self.terminate(&mut child).await;
                let status = match terminated {
                    Terminated::Exited => RunStatus::TimedOut,
                    Terminated::Unresponsive => RunStatus::KilledAfterTimeout,
                };
                let outcome = RunOutcome {
                    status,
                    stdout: stdout_lines.join("\n"),
                    stderr: stderr_lines.join("\n"),
                };
                progress.done(false, outcome.output());
                return Ok(outcome);
            }
        };

        let outcome = RunOutcome {
            status: if status.success() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            },
            stdout: stdout_lines.join("\n"),
            stderr: stderr_lines.join("\n"),
        };

        if outcome.success() {
            // Synthetic terminal percentage on clean exit.
            progress.emit(100, "Operation complete");
            progress.done(true, outcome.stdout.clone());
        } else {
            progress.done(false, outcome.output());
        }
        Ok(outcome)
    }

    /// Graceful termination request, escalating to a forced kill after
    /// the grace period.
    async fn terminate(&self, child: &mut Child) -> Terminated {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                #[allow(clippy::cast_possible_wrap)]
                unsafe {
                    libc::kill(pid as i32, libc::SIGTERM);
                }
                if tokio::time::timeout(self.grace, child.wait()).await.is_ok() {
                    return Terminated::Exited;
                }
            }
        }

        let _ = child.start_kill();
        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(_) => Terminated::Exited,
            Err(_) => Terminated::Unresponsive,
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn infer_progress(line: &str, progress: &ProgressSink) {
    let lowered = line.to_lowercase();
    for (needle, percent, message) in PROGRESS_NEEDLES {
        if lowered.contains(needle) {
            progress.emit(percent, message);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::OperationEvent;

    fn sh(script: &str) -> (String, Vec<String>) {
        (
            "/bin/sh".to_string(),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    async fn run_script(
        script: &str,
        deadline: Duration,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> RunOutcome {
        let (program, args) = sh(script);
        ProcessMonitor::new()
            .with_grace(Duration::from_millis(200))
            .run(&program, &args, &[], deadline, progress, cancel)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn clean_exit_captures_stdout() {
        let outcome = run_script(
            "echo hello",
            Duration::from_secs(5),
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await;
        assert!(outcome.success());
        assert_eq!(outcome.stdout, "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let outcome = run_script(
            "echo boom >&2; exit 3",
            Duration::from_secs(5),
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await;
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(!outcome.success());
        assert_eq!(outcome.output(), "boom");
    }

    #[tokio::test]
    async fn nonzero_exit_with_silent_stderr() {
        let outcome = run_script(
            "exit 1",
            Duration::from_secs(5),
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await;
        assert_eq!(outcome.output(), "Unknown error");
    }

    #[tokio::test]
    async fn progress_inferred_from_stdout_needles() {
        let (sink, mut rx) = ProgressSink::channel();
        let outcome = run_script(
            "echo Extracting package; echo Processing files; echo done",
            Duration::from_secs(5),
            &sink,
            &CancelFlag::new(),
        )
        .await;
        assert!(outcome.success());

        let mut percents = Vec::new();
        let mut saw_done = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                OperationEvent::Progress { percent, .. } => percents.push(percent),
                OperationEvent::Done { success, .. } => saw_done = success,
            }
        }
        assert_eq!(percents, vec![30, 50, 100]);
        assert!(saw_done);
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let (sink, mut rx) = ProgressSink::channel();
        run_script(
            "echo completed; echo extracting",
            Duration::from_secs(5),
            &sink,
            &CancelFlag::new(),
        )
        .await;

        let mut last = 0;
        while let Ok(OperationEvent::Progress { percent, .. }) = rx.try_recv() {
            assert!(percent >= last);
            last = percent;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn cancellation_is_prompt_and_distinct() {
        let cancel = CancelFlag::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let started = std::time::Instant::now();
        let outcome = run_script(
            "sleep 30",
            Duration::from_secs(60),
            &ProgressSink::disabled(),
            &cancel,
        )
        .await;
        canceller.await.unwrap();

        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert_eq!(outcome.output(), "cancelled");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn deadline_reports_timeout() {
        let outcome = run_script(
            "sleep 30",
            Duration::from_millis(100),
            &ProgressSink::disabled(),
            &CancelFlag::new(),
        )
        .await;
        assert_eq!(outcome.status, RunStatus::TimedOut);
        assert_eq!(outcome.output(), "timeout");
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        let result = ProcessMonitor::new()
            .run(
                "/nonexistent/converter-binary",
                &[],
                &[],
                Duration::from_secs(1),
                &ProgressSink::disabled(),
                &CancelFlag::new(),
            )
            .await;
        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }
}
