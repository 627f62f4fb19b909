//! Synchronous external command execution with timeouts.
//!
//! Every external program the packager touches (`composer`, `git`) runs
//! through [`CommandExecutor`]. The system implementation enforces the run's
//! timeout and kills the child when it expires; a timeout is reported the
//! same way as a non-zero exit.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command to completion and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this layer; callers decide
    /// through [`ensure_success`].
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ExternalProcess`] if the command cannot be
    /// spawned or exceeds the timeout.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use contao_packager::process::{CommandExecutor, SystemCommandExecutor};
    /// use std::time::Duration;
    ///
    /// let executor = SystemCommandExecutor::new(Duration::from_secs(30));
    /// let output = executor.run("git", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), contao_packager::error::PackagerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], working_dir: Option<&Utf8Path>) -> Result<Output>;

    /// Runs a command, forwarding its stdout and stderr lines to `sink` as
    /// they arrive, and returns the captured output.
    ///
    /// # Errors
    ///
    /// Same as [`CommandExecutor::run`].
    fn run_streaming(
        &self,
        cmd: &str,
        args: &[&str],
        working_dir: Option<&Utf8Path>,
        sink: &mut dyn Write,
    ) -> Result<Output>;
}

/// Executes commands on the host system with a fixed timeout.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Creates an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn spawn(cmd: &str, args: &[&str], working_dir: Option<&Utf8Path>) -> Result<Child> {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = working_dir {
            command.current_dir(dir.as_std_path());
        }

        command.spawn().map_err(|e| PackagerError::ExternalProcess {
            command: command_line(cmd, args),
            message: format!("failed to start: {e}"),
        })
    }

    fn timed_out(&self, child: &mut Child, cmd: &str, args: &[&str]) -> PackagerError {
        // The child may already have exited between the timeout and the kill.
        if child.kill().is_err() {
            log::debug!("{cmd} exited before it could be killed");
        }
        if child.wait().is_err() {
            log::debug!("failed to reap timed out {cmd}");
        }
        PackagerError::ExternalProcess {
            command: command_line(cmd, args),
            message: format!(
                "operation timed out after {} seconds",
                self.timeout.as_secs()
            ),
        }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], working_dir: Option<&Utf8Path>) -> Result<Output> {
        log::debug!("running {}", command_line(cmd, args));
        let mut child = Self::spawn(cmd, args, working_dir)?;

        // Drain both pipes while waiting so a chatty child cannot block on a
        // full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = child.wait_timeout(self.timeout)? else {
            return Err(self.timed_out(&mut child, cmd, args));
        };

        Ok(Output {
            status,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
        })
    }

    fn run_streaming(
        &self,
        cmd: &str,
        args: &[&str],
        working_dir: Option<&Utf8Path>,
        sink: &mut dyn Write,
    ) -> Result<Output> {
        log::debug!("running {} (streaming)", command_line(cmd, args));
        let deadline = Instant::now() + self.timeout;
        let mut child = Self::spawn(cmd, args, working_dir)?;

        let (sender, receiver) = mpsc::channel();
        if let Some(pipe) = child.stdout.take() {
            forward_lines(pipe, StreamKind::Stdout, sender.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            forward_lines(pipe, StreamKind::Stderr, sender.clone());
        }
        drop(sender);

        let mut captured = Output {
            status: ExitStatus::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(&mut child, cmd, args));
            }
            match receiver.recv_timeout(remaining) {
                Ok((kind, line)) => {
                    if sink.write_all(line.as_bytes()).is_err() {
                        // Best-effort forwarding; the line is still captured.
                    }
                    match kind {
                        StreamKind::Stdout => captured.stdout.extend_from_slice(line.as_bytes()),
                        StreamKind::Stderr => captured.stderr.extend_from_slice(line.as_bytes()),
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(self.timed_out(&mut child, cmd, args));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let Some(status) = child.wait_timeout(remaining)? else {
            return Err(self.timed_out(&mut child, cmd, args));
        };
        captured.status = status;
        Ok(captured)
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if pipe.read_to_end(&mut buffer).is_err() {
            log::debug!("failed to read child output pipe");
        }
        buffer
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn forward_lines<R: Read + Send + 'static>(
    pipe: R,
    kind: StreamKind,
    sender: mpsc::Sender<(StreamKind, String)>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if sender.send((kind, line.clone())).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Formats a command and its arguments for messages.
#[must_use]
pub fn command_line(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Converts an unsuccessful command output into an error.
///
/// The error message carries the trimmed stderr, falling back to the exit
/// status when the command wrote nothing to stderr.
///
/// # Errors
///
/// Returns [`PackagerError::ExternalProcess`] when the exit status is not
/// successful.
pub fn ensure_success(cmd: &str, args: &[&str], output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.trim().to_owned()
    };

    Err(PackagerError::ExternalProcess {
        command: command_line(cmd, args),
        message,
    })
}

/// Runs a command and returns its trimmed stdout, failing on non-zero exit.
///
/// # Errors
///
/// Returns [`PackagerError::ExternalProcess`] on spawn failure, timeout or
/// non-zero exit.
pub fn run_for_stdout(
    executor: &dyn CommandExecutor,
    cmd: &str,
    args: &[&str],
    working_dir: Option<&Utf8Path>,
) -> Result<String> {
    let output = ensure_success(cmd, args, executor.run(cmd, args, working_dir)?)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{failure_output, success_output};

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line("git", &["rev-parse", "HEAD"]),
            "git rev-parse HEAD"
        );
    }

    #[test]
    fn ensure_success_passes_successful_output_through() {
        let output = ensure_success("git", &["status"], success_output());
        assert!(output.is_ok());
    }

    #[test]
    fn ensure_success_reports_trimmed_stderr() {
        let err = ensure_success("git", &["status"], failure_output("  fatal: nope \n"))
            .expect_err("expected failure");
        assert!(matches!(
            err,
            PackagerError::ExternalProcess { ref command, ref message }
                if command == "git status" && message == "fatal: nope"
        ));
    }

    #[test]
    fn ensure_success_falls_back_to_exit_status() {
        let err = ensure_success("php", &["composer.phar"], failure_output(""))
            .expect_err("expected failure");
        assert!(err.to_string().contains("exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_captures_stdout() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(10));
        let output = executor
            .run("sh", &["-c", "echo hello"], None)
            .expect("sh should run");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_kills_on_timeout() {
        let executor = SystemCommandExecutor::new(Duration::from_millis(200));
        let err = executor
            .run("sh", &["-c", "sleep 5"], None)
            .expect_err("expected timeout");
        assert!(err.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn streaming_forwards_both_streams() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(10));
        let mut sink = Vec::new();
        let output = executor
            .run_streaming("sh", &["-c", "echo out; echo err 1>&2"], None, &mut sink)
            .expect("sh should run");

        let forwarded = String::from_utf8_lossy(&sink);
        assert!(forwarded.contains("out"));
        assert!(forwarded.contains("err"));
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
        assert!(output.status.success());
    }

    #[test]
    fn spawn_failure_is_external_process_error() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(1));
        let err = executor
            .run("definitely-not-a-real-binary-xyz", &[], None)
            .expect_err("expected spawn failure");
        assert!(err.is_external_process());
    }
}
