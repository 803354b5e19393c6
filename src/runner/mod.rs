//! Subprocess execution behind a small trait so orchestration can be driven
//! by scripted fakes in tests.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Signal that terminated the process, if any.
    pub signal: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit status as a shell reports it: the exit code, or 128 plus the
    /// signal number when the process was killed.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.code
            .or_else(|| self.signal.map(|signal| SIGNAL_EXIT_BASE.saturating_add(signal)))
    }

    /// Human readable exit status, `unknown` when the process reported none.
    #[must_use]
    pub fn status_text(&self) -> String {
        match (self.code, self.signal, self.exit_code()) {
            (None, Some(signal), Some(status)) => format!("{status} (signal {signal})"),
            (_, _, Some(status)) => status.to_string(),
            (_, _, None) => String::from("unknown"),
        }
    }

    fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            code: status.code(),
            signal: terminating_signal(status),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

/// Offset POSIX shells add to a signal number to form an exit status.
const SIGNAL_EXIT_BASE: i32 = 128;

/// Errors raised when a command cannot be run to completion.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when feeding stdin or collecting output fails mid-run.
    #[error("failed to exchange data with {program}: {message}")]
    Io {
        /// Command being run.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;

    /// Runs `program` with `input` written to its standard input.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started and
    /// [`RunnerError::Io`] if stdin cannot be written.
    fn run_with_input(
        &self,
        program: &str,
        args: &[OsString],
        input: &str,
    ) -> Result<CommandOutput, RunnerError>;

    /// Runs `program` attached to this process's stdin, stdout and stderr.
    ///
    /// Nothing is captured, so the returned output has empty `stdout` and
    /// `stderr`. Used for the test framework so it sees the caller's terminal.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run_inherited(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;
}

/// Real command runner that captures output without forwarding it.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| spawn_error(program, &err))?;

        Ok(CommandOutput::from_status(
            output.status,
            &output.stdout,
            &output.stderr,
        ))
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[OsString],
        input: &str,
    ) -> Result<CommandOutput, RunnerError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_error(program, &err))?;

        let stdin = child.stdin.take();
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || feed_stdin(stdin, input));
            let output = child.wait_with_output();
            join_io(writer).and(output)
        })
        .map_err(|err| io_error(program, &err))?;

        Ok(CommandOutput::from_status(
            output.status,
            &output.stdout,
            &output.stderr,
        ))
    }

    fn run_inherited(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        run_attached(program, args)
    }
}

/// Runner that forwards child output to this process's stdout and stderr as
/// it arrives while still capturing it.
///
/// Used for the setup steps so CI logs show their output while stderr stays
/// available for error reports.
#[derive(Clone, Debug, Default)]
pub struct StreamingCommandRunner;

impl StreamingCommandRunner {
    fn execute(
        program: &str,
        args: &[OsString],
        input: Option<&str>,
    ) -> Result<CommandOutput, RunnerError> {
        let stdin = if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_error(program, &err))?;

        let (status, stdout, stderr) =
            stream_child(&mut child, input).map_err(|err| io_error(program, &err))?;

        Ok(CommandOutput::from_status(status, &stdout, &stderr))
    }
}

impl CommandRunner for StreamingCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        Self::execute(program, args, None)
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[OsString],
        input: &str,
    ) -> Result<CommandOutput, RunnerError> {
        Self::execute(program, args, Some(input))
    }

    fn run_inherited(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        run_attached(program, args)
    }
}

fn run_attached(program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|err| spawn_error(program, &err))?;
    Ok(CommandOutput::from_status(status, &[], &[]))
}

#[cfg(unix)]
fn terminating_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
const fn terminating_signal(_status: ExitStatus) -> Option<i32> {
    None
}

fn stream_child(
    child: &mut Child,
    input: Option<&str>,
) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        let writer = scope.spawn(move || match input {
            Some(text) => feed_stdin(stdin, text),
            None => Ok(()),
        });
        let out = scope.spawn(move || pump(stdout, io::stdout()));
        let err = scope.spawn(move || pump(stderr, io::stderr()));

        let status = child.wait();
        join_io(writer)?;
        let captured_out = join_io(out)?;
        let captured_err = join_io(err)?;
        Ok((status?, captured_out, captured_err))
    })
}

fn feed_stdin(stdin: Option<impl Write>, input: &str) -> io::Result<()> {
    let Some(mut pipe) = stdin else {
        return Ok(());
    };
    pipe.write_all(input.as_bytes())?;
    pipe.flush()
}

/// Copies `source` into `sink` chunk by chunk and returns everything read.
/// Forwarding failures (for example a closed terminal) do not stop capture.
fn pump(source: Option<impl Read>, mut sink: impl Write) -> io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let Some(mut reader) = source else {
        return Ok(captured);
    };

    let mut buffer = [0_u8; 8192];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        sink.write_all(chunk).and_then(|()| sink.flush()).ok();
        captured.extend_from_slice(chunk);
    }
    Ok(captured)
}

fn join_io<T>(handle: thread::ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .map_err(|_| io::Error::other("output thread panicked"))?
}

fn spawn_error(program: &str, err: &io::Error) -> RunnerError {
    RunnerError::Spawn {
        program: program.to_owned(),
        message: err.to_string(),
    }
}

fn io_error(program: &str, err: &io::Error) -> RunnerError {
    RunnerError::Io {
        program: program.to_owned(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests;
