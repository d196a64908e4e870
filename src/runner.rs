//! Subprocess runner: builds and executes the child process for one
//! [`Execution`], then harvests anything it exported via `TASKFORGE_EXPORT`.
//! Build and run are split into separate calls, and running twice is a
//! programming error rather than a recoverable one.

use crate::error::{fatal, RunnerError};
use crate::interpreter;
use crate::model::execution::Execution;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering, AtomicU64};
use std::time::{SystemTime, UNIX_EPOCH};

const EXPORT_ENV_VAR: &str = "TASKFORGE_EXPORT";

static EXPORT_FILE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Builds a unique, time-ordered file name for an export file: a
/// millisecond timestamp followed by a per-process sequence number, so two
/// executions started within the same millisecond still sort and never
/// collide.
fn export_file_name(execution_id: impl std::fmt::Display) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = EXPORT_FILE_SEQUENCE.fetch_add(1, Ordering::SeqCst);
    format!(".taskforge-export-{millis}-{seq}-{execution_id}")
}

/// The outcome of a completed run: exit code plus the raw lines the child
/// exported via `TASKFORGE_EXPORT`. Lines are passed through verbatim — no
/// `KEY=VALUE` parsing is performed here.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub exported: Vec<String>,
}

/// Creates the export file empty, mode `0600`, before the child ever sees
/// its path — the file must exist and be private before it's handed to the
/// child as `TASKFORGE_EXPORT`, not left for the child's own shell redirect
/// to create.
#[cfg(unix)]
fn create_export_file(path: &std::path::Path) -> Result<(), RunnerError> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(RunnerError::Io)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_export_file(path: &std::path::Path) -> Result<(), RunnerError> {
    std::fs::File::create(path).map_err(RunnerError::Io)?;
    Ok(())
}

/// A built, not-yet-started child process for one execution. Holds the
/// export-file path so it can be harvested and cleaned up after the process
/// exits, regardless of how it exits.
pub struct Runner {
    command: Command,
    export_path: std::path::PathBuf,
    started: AtomicBool,
}

impl Runner {
    /// Resolves the interpreter, wires up the export file, and builds (but
    /// does not spawn) the child process.
    pub fn build(execution: &Execution) -> Result<Self, RunnerError> {
        let resolved = interpreter::resolve(execution)?;

        let export_path = std::path::Path::new(&execution.working_dir)
            .join(export_file_name(execution.id));
        create_export_file(&export_path)?;

        let mut command = Command::new(&resolved.path);
        command.args(&resolved.args);
        command.current_dir(&execution.working_dir);
        command.env_clear();
        for entry in &execution.environments {
            if let Some((key, value)) = entry.split_once('=') {
                command.env(key, value);
            }
        }
        command.env(EXPORT_ENV_VAR, &export_path);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        Ok(Self {
            command,
            export_path,
            started: AtomicBool::new(false),
        })
    }

    /// Spawns the child, returning it with its stdout/stderr pipes attached
    /// for the caller to stream. Calling this twice on the same `Runner` is a
    /// programming error, not a recoverable one.
    pub fn spawn(&mut self) -> Result<Child, RunnerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            fatal("Runner::spawn called twice on the same runner");
        }
        self.command.spawn().map_err(RunnerError::Spawn)
    }

    /// Waits for `child` to exit, then harvests and deletes the export file.
    /// The export file is removed unconditionally, whether or not it was
    /// ever written.
    pub fn finish(&self, mut child: Child) -> Result<RunOutcome, RunnerError> {
        let status = child.wait().map_err(RunnerError::Io)?;
        let exported = self.harvest_exports();
        let exit_code = status.code().unwrap_or(-1);
        Ok(RunOutcome {
            exit_code,
            exported,
        })
    }

    /// Reads the export file, splits on `\n`, and drops only empty lines.
    /// Lines with no `=` are passed through unchanged — no `KEY=VALUE`
    /// validation is performed here.
    fn harvest_exports(&self) -> Vec<String> {
        let contents = std::fs::read_to_string(&self.export_path).unwrap_or_default();
        let _ = std::fs::remove_file(&self.export_path);

        contents
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Reads an already-spawned child's stdout/stderr to completion into
/// caller-supplied buffers, so a hot scheduling loop can reuse buffers from
/// [`crate::pool::BytePool`] instead of allocating on every task.
pub fn drain_pipes_into(
    child: &mut Child,
    stdout_buf: &mut Vec<u8>,
    stderr_buf: &mut Vec<u8>,
) -> Result<(), RunnerError> {
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_end(stdout_buf).map_err(RunnerError::Io)?;
    }
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_end(stderr_buf).map_err(RunnerError::Io)?;
    }
    Ok(())
}

/// Reads an already-spawned child's stdout/stderr to completion. Returned as
/// owned buffers; line-oriented consumers should prefer
/// [`crate::stream::split_lines`] on the raw bytes.
pub fn drain_pipes(child: &mut Child) -> Result<(Vec<u8>, Vec<u8>), RunnerError> {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    drain_pipes_into(child, &mut stdout_buf, &mut stderr_buf)?;
    Ok((stdout_buf, stderr_buf))
}

/// Sends a POSIX signal to a process by pid directly — used both by
/// [`send_signal`] and by a cancellation watcher that only has the pid, not
/// the owning `Child` (which is borrowed elsewhere awaiting exit).
#[cfg(unix)]
pub fn send_signal_by_pid(pid: u32, signal: libc::c_int) -> Result<(), RunnerError> {
    let result = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(RunnerError::Io(std::io::Error::last_os_error()))
    }
}

#[cfg(not(unix))]
pub fn send_signal_by_pid(_pid: u32, _signal: i32) -> Result<(), RunnerError> {
    Err(RunnerError::NotImplementedFor { os: "non-unix" })
}

/// Sends a POSIX signal to `child` by pid. `std::process::Child` only
/// exposes an unconditional SIGKILL via `kill()`; graceful shutdown (e.g.
/// SIGTERM on fail-fast cancellation) needs the raw syscall.
#[cfg(unix)]
pub fn send_signal(child: &Child, signal: libc::c_int) -> Result<(), RunnerError> {
    send_signal_by_pid(child.id(), signal)
}

#[cfg(not(unix))]
pub fn send_signal(_child: &Child, _signal: i32) -> Result<(), RunnerError> {
    Err(RunnerError::NotImplementedFor { os: "non-unix" })
}
