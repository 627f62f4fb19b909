//! Shared test utilities for the packager crate.

use crate::error::{PackagerError, Result};
use crate::process::{CommandExecutor, command_line};
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "git").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Creates an expectation returning `result`.
    #[must_use]
    pub fn new(cmd: &'static str, args: &[&str], result: Result<Output>) -> Self {
        Self {
            cmd,
            args: args.iter().map(|&a| a.to_owned()).collect(),
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
/// Streaming runs forward the stubbed stdout to the sink.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Returns the number of expected calls not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.expected.borrow().len()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }

    fn next_call(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let Some(call) = expected.pop_front() else {
            return Err(PackagerError::StubMismatch {
                message: format!("unexpected command invocation: {}", command_line(cmd, args)),
            });
        };

        if call.cmd != cmd || call.args != args {
            let wanted: Vec<&str> = call.args.iter().map(String::as_str).collect();
            return Err(PackagerError::StubMismatch {
                message: format!(
                    "expected `{}`, got `{}`",
                    command_line(call.cmd, &wanted),
                    command_line(cmd, args)
                ),
            });
        }

        call.result
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], _working_dir: Option<&Utf8Path>) -> Result<Output> {
        self.next_call(cmd, args)
    }

    fn run_streaming(
        &self,
        cmd: &str,
        args: &[&str],
        _working_dir: Option<&Utf8Path>,
        sink: &mut dyn Write,
    ) -> Result<Output> {
        let output = self.next_call(cmd, args)?;
        if sink.write_all(&output.stdout).is_err() {
            // Best-effort forwarding, as in the system executor.
        }
        Ok(output)
    }
}
