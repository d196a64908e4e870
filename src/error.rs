//! Engine-wide error types.
//!
//! Per-task failures (bad interpreter, spawn failure, non-zero exit) are
//! reported as typed errors but never abort a run on their own; the scheduler
//! decides what a failure means for the rest of the graph. [`EngineError`]
//! covers the handful of conditions that abort a run before any task starts.

use crate::validate::ValidationError;
use std::fmt;

/// Errors that can occur while resolving an interpreter for an execution.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("'{0}' command not found")]
    CommandNotFound(String),

    #[error("'{0}' environment not found")]
    EnvironmentNotFound(String),
}

/// Errors surfaced by the subprocess runner. All of these mark a task `Failed`
/// without aborting the rest of the run (fail-fast is a scheduler decision).
#[derive(thiserror::Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error("could not spawn child process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("i/o error communicating with child process: {0}")]
    Io(#[source] std::io::Error),

    #[error("not implemented for {os}")]
    NotImplementedFor { os: &'static str },

    #[error("process has already exited")]
    ExitedProcess,
}

/// Errors raised while resolving the dependency graph, before any task is
/// dispatched.
#[derive(thiserror::Error, Debug)]
pub enum ResolverError {
    #[error("cyclic dependency detected: {}", render_path(.0))]
    CyclicDependency(Vec<String>),

    #[error("execution '{0}' references unknown execution '{1}'")]
    UnknownReference(String, String),
}

fn render_path(path: &[String]) -> String {
    path.join(" -> ")
}

/// Top-level engine error. Most callers match on the specific error enum of
/// the component they invoked directly; this exists for contexts (CLI glue,
/// top-of-stack logging) that want one error type to bubble up through `?`.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    #[error("unknown execution '{0}'")]
    UnknownExecution(String),
}

/// Raised only for programming-bug invariant violations that should never
/// happen given correct internal usage (double-registering a task, calling
/// `run` twice on the same runner). These are fatal assertions, not part of
/// the recoverable error surface.
pub fn fatal(msg: impl fmt::Display) -> ! {
    panic!("taskforge internal invariant violated: {msg}")
}
