//! The scheduler: a controller thread plus a bounded pool of worker threads,
//! talking over `crossbeam::channel`s. Uses OS threads and message passing
//! rather than an async runtime — nothing about a subprocess-spawning
//! scheduler needs an async reactor, so `std::thread::scope` lets worker and
//! controller closures borrow `&Execution`/`&StatusManager` directly instead
//! of cloning into `Arc`s.
//!
//! The controller performs the Waiting-to-Running transition itself,
//! synchronously, via [`crate::status_manager::StatusManager::prepare_task`],
//! before ever handing the task to a worker — no separate "worker reports it
//! started" handshake is needed. Tasks that are still `Waiting` when the run
//! ends (because a sibling failed and fail-fast cancelled the rest) are swept
//! to `NotPlan`, not left `Waiting` forever.
//!
//! Each worker opens a span under the run's root span for every task it
//! executes, decorates the task's stdout/stderr with a label from a bounded
//! pool, and emits one [`trace::LogRecord`] per output line over a log-sink
//! channel the caller drains from [`RunSummary::log_rx`]. Fail-fast cancels
//! in-flight subprocesses by signal rather than letting them run to
//! completion unattended.

use crate::condition::{self, ConditionContext};
use crate::error::{EngineError, RunnerError};
use crate::model::ids::ExecutionId;
use crate::model::execution::Execution;
use crate::model::project::Project;
use crate::model::status::TaskStatus;
use crate::pool::BytePool;
use crate::runner::{self, Runner};
use crate::status_manager::StatusManager;
use crate::stream::{self, OutputDecoration};
use crate::trace::{self, LogRecord, Span};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a worker waits after sending SIGTERM before escalating to
/// SIGKILL on fail-fast cancellation.
const GRACEFUL_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(3);
const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How many worker threads to run and, later, anything else that tunes the
/// scheduler's behavior without changing its algorithm.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub num_workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// The terminal outcome of one call to [`execute`]: the final status of
/// every task that was in scope, in dependency order, plus every structured
/// log line the run produced. By the time `execute` returns, every worker
/// thread has already exited, so `log_rx` is fully populated and safe to
/// drain without racing a producer.
pub struct RunSummary {
    pub statuses: Vec<(ExecutionId, String, TaskStatus)>,
    pub overall: TaskStatus,
    pub log_rx: Receiver<LogRecord>,
}

impl std::fmt::Debug for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSummary")
            .field("statuses", &self.statuses)
            .field("overall", &self.overall)
            .finish()
    }
}

struct WorkerRequest<'a> {
    execution: &'a Execution,
}

/// Resolves `roots` against `project`, then runs the full transitive closure
/// to completion, fanning work out to `config.num_workers` worker threads.
pub fn execute(
    project: &Project,
    roots: &[String],
    config: &SchedulerConfig,
) -> Result<RunSummary, EngineError> {
    let order = crate::resolver::resolve(project, roots)?;

    let (_tracer, root_span, close_root_span) =
        trace::new_tracer_and_root_span("execute", serde_json::Map::new());
    let (log_tx, log_rx) = unbounded::<LogRecord>();

    let executions: Vec<&Execution> = order
        .iter()
        .map(|name| {
            project
                .get_execution(name)
                .expect("resolver only returns names that exist in the project")
        })
        .collect();

    if executions.is_empty() {
        close_root_span();
        return Ok(RunSummary {
            statuses: Vec::new(),
            overall: TaskStatus::Success,
            log_rx,
        });
    }

    let status_manager = Arc::new(StatusManager::new());
    let mut name_to_id: HashMap<&str, ExecutionId> = HashMap::new();
    for execution in &executions {
        status_manager.register(execution.id, TaskStatus::Waiting);
        name_to_id.insert(execution.name.as_str(), execution.id);
    }

    let ids: Vec<ExecutionId> = executions.iter().map(|e| e.id).collect();

    let mut deps: HashMap<ExecutionId, Vec<ExecutionId>> = HashMap::new();
    for execution in &executions {
        let prev_ids = execution
            .prev_executions
            .iter()
            .map(|reference| {
                *name_to_id
                    .get(reference.name.as_str())
                    .expect("resolver already validated every reference exists")
            })
            .collect();
        deps.insert(execution.id, prev_ids);
    }

    let num_workers = config.num_workers.max(1).min(executions.len());
    let (request_tx, request_rx) = bounded::<WorkerRequest<'_>>(0);
    let (state_tx, state_rx) = bounded::<()>(ids.len() * 2);
    let cancelled = Arc::new(AtomicBool::new(false));
    let byte_pool = Arc::new(BytePool::new(num_workers * 2));
    let decoration_labels = (0..num_workers).map(|n| n.to_string()).collect();
    let (decoration_tx, decoration_rx) = stream::decoration_pool(decoration_labels);

    std::thread::scope(|scope| {
        for _ in 0..num_workers {
            let request_rx = request_rx.clone();
            let state_tx = state_tx.clone();
            let status_manager = status_manager.clone();
            let cancelled = cancelled.clone();
            let root_span = root_span.clone();
            let log_tx = log_tx.clone();
            let byte_pool = byte_pool.clone();
            let decoration_tx = decoration_tx.clone();
            let decoration_rx = decoration_rx.clone();
            scope.spawn(move || {
                worker_loop(
                    request_rx,
                    state_tx,
                    status_manager,
                    cancelled,
                    &root_span,
                    &log_tx,
                    &byte_pool,
                    &decoration_tx,
                    &decoration_rx,
                )
            });
        }
        drop(request_rx);
        drop(log_tx);

        scope.spawn(move || {
            controller_loop(
                &executions,
                &ids,
                &deps,
                &status_manager,
                &cancelled,
                request_tx,
                state_rx,
            );
        });
    });

    close_root_span();

    let statuses = executions
        .iter()
        .map(|execution| {
            (
                execution.id,
                execution.name.clone(),
                status_manager.status_of(execution.id).unwrap_or(TaskStatus::Undefined),
            )
        })
        .collect();

    let overall = status_manager.aggregate(&ids);
    Ok(RunSummary {
        statuses,
        overall,
        log_rx,
    })
}

fn find_ready<'a>(
    executions: &[&'a Execution],
    ids: &[ExecutionId],
    deps: &HashMap<ExecutionId, Vec<ExecutionId>>,
    status_manager: &StatusManager,
) -> Option<&'a Execution> {
    for id in ids {
        if status_manager.status_of(*id) != Some(TaskStatus::Waiting) {
            continue;
        }
        let ready = deps
            .get(id)
            .map(|parents| {
                parents
                    .iter()
                    .all(|parent| status_manager.status_of(*parent) == Some(TaskStatus::Success))
            })
            .unwrap_or(true);
        if ready && status_manager.prepare_task(*id) {
            return executions.iter().find(|e| e.id == *id).copied();
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn controller_loop<'a>(
    executions: &[&'a Execution],
    ids: &[ExecutionId],
    deps: &HashMap<ExecutionId, Vec<ExecutionId>>,
    status_manager: &StatusManager,
    cancelled: &AtomicBool,
    request_tx: crossbeam::channel::Sender<WorkerRequest<'a>>,
    state_rx: crossbeam::channel::Receiver<()>,
) {
    loop {
        if !cancelled.load(Ordering::SeqCst) {
            while let Some(execution) = find_ready(executions, ids, deps, status_manager) {
                if request_tx.send(WorkerRequest { execution }).is_err() {
                    break;
                }
            }
        }

        let running = ids
            .iter()
            .filter(|id| status_manager.status_of(**id) == Some(TaskStatus::Running))
            .count();
        if running == 0 {
            break;
        }

        if state_rx.recv().is_err() {
            break;
        }
        while state_rx.try_recv().is_ok() {}
    }

    for id in ids {
        if status_manager.status_of(*id) == Some(TaskStatus::Waiting) {
            status_manager.update(*id, TaskStatus::NotPlan);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    request_rx: crossbeam::channel::Receiver<WorkerRequest<'_>>,
    state_tx: crossbeam::channel::Sender<()>,
    status_manager: Arc<StatusManager>,
    cancelled: Arc<AtomicBool>,
    root_span: &Arc<Span>,
    log_tx: &Sender<LogRecord>,
    byte_pool: &BytePool,
    decoration_tx: &Sender<OutputDecoration>,
    decoration_rx: &Receiver<OutputDecoration>,
) {
    while let Ok(request) = request_rx.recv() {
        run_one(
            request.execution,
            &status_manager,
            &cancelled,
            root_span,
            log_tx,
            byte_pool,
            decoration_tx,
            decoration_rx,
        );
        let _ = state_tx.send(());
    }
}

/// Polls `cancelled` until either the subprocess finishes (`done` flips) or
/// cancellation fires. On cancellation it sends SIGTERM immediately, then
/// escalates to SIGKILL if the process is still running once the graceful
/// shutdown deadline elapses.
#[cfg(unix)]
fn watch_for_cancellation(pid: u32, cancelled: &AtomicBool, done: &AtomicBool) {
    loop {
        if done.load(Ordering::SeqCst) {
            return;
        }
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(CANCELLATION_POLL_INTERVAL);
    }

    let _ = runner::send_signal_by_pid(pid, libc::SIGTERM);

    let deadline = Instant::now() + GRACEFUL_SHUTDOWN_DEADLINE;
    while Instant::now() < deadline {
        if done.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(CANCELLATION_POLL_INTERVAL);
    }

    if !done.load(Ordering::SeqCst) {
        let _ = runner::send_signal_by_pid(pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn watch_for_cancellation(_pid: u32, _cancelled: &AtomicBool, _done: &AtomicBool) {}

/// Splits `bytes` into lines and emits one [`LogRecord`] per line under
/// `span`, decorated with the task's assigned output label.
fn emit_stream_logs(
    log_tx: &Sender<LogRecord>,
    span: &Arc<Span>,
    stream_kind: &str,
    decoration: &OutputDecoration,
    bytes: &[u8],
) {
    for line in stream::split_lines(bytes) {
        let mut attrs = serde_json::Map::new();
        attrs.insert("stream".into(), serde_json::Value::String(stream_kind.into()));
        attrs.insert(
            "decoration".into(),
            serde_json::Value::String(decoration.label.clone()),
        );
        let message = String::from_utf8_lossy(&line).into_owned();
        let _ = log_tx.send(LogRecord::new(span.clone(), tracing::Level::INFO, message, attrs));
    }
}

#[allow(clippy::too_many_arguments)]
fn run_one(
    execution: &Execution,
    status_manager: &StatusManager,
    cancelled: &AtomicBool,
    root_span: &Arc<Span>,
    log_tx: &Sender<LogRecord>,
    byte_pool: &BytePool,
    decoration_tx: &Sender<OutputDecoration>,
    decoration_rx: &Receiver<OutputDecoration>,
) {
    let mut attrs = serde_json::Map::new();
    attrs.insert("task".into(), serde_json::Value::String(execution.name.clone()));
    let span = root_span.child(format!("execute/worker/{}", execution.id), attrs);

    let ctx = ConditionContext;

    match condition::any_skip_fires(&execution.skip_conditions, ctx) {
        Ok(true) => {
            status_manager.update(execution.id, TaskStatus::Success);
            span.close();
            return;
        }
        Ok(false) => {}
        Err(_) => {
            status_manager.update(execution.id, TaskStatus::Failed);
            cancelled.store(true, Ordering::SeqCst);
            span.close();
            return;
        }
    }

    match condition::all_requires_satisfied(&execution.require_conditions, ctx) {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            status_manager.update(execution.id, TaskStatus::Failed);
            cancelled.store(true, Ordering::SeqCst);
            span.close();
            return;
        }
    }

    // Decorations are a bounded resource (one slot per worker); block until
    // one is free rather than skipping decoration.
    let decoration = decoration_rx.recv().expect("decoration pool outlives every worker");

    let outcome = (|| -> Result<runner::RunOutcome, RunnerError> {
        let mut built = Runner::build(execution)?;
        let mut child = built.spawn()?;
        let pid = child.id();

        let mut stdout_buf = byte_pool.take();
        let mut stderr_buf = byte_pool.take();
        let done = AtomicBool::new(false);

        let drain_result = std::thread::scope(|scope| {
            scope.spawn(|| watch_for_cancellation(pid, cancelled, &done));
            let result = runner::drain_pipes_into(&mut child, &mut stdout_buf, &mut stderr_buf);
            done.store(true, Ordering::SeqCst);
            result
        });
        drain_result?;

        emit_stream_logs(log_tx, &span, "stdout", &decoration, &stdout_buf);
        emit_stream_logs(log_tx, &span, "stderr", &decoration, &stderr_buf);
        byte_pool.release(stdout_buf);
        byte_pool.release(stderr_buf);

        built.finish(child)
    })();

    let _ = decoration_tx.send(decoration);

    match outcome {
        Ok(outcome) if outcome.exit_code == 0 => {
            status_manager.update(execution.id, TaskStatus::Success);
        }
        _ => {
            status_manager.update(execution.id, TaskStatus::Failed);
            cancelled.store(true, Ordering::SeqCst);
        }
    }
    span.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::execution::ExecutionBuilder;
    use crate::model::reference::ReferenceExecution;

    fn exec(name: &str, script: &str, deps: &[&str]) -> Execution {
        let mut builder = ExecutionBuilder::new()
            .name(name)
            .language("sh")
            .script(script)
            .working_dir(std::env::temp_dir().to_str().unwrap());
        for dep in deps {
            builder = builder.prev(ReferenceExecution::new(*dep));
        }
        builder.build().unwrap()
    }

    #[test]
    fn dependency_chain_runs_in_order() {
        let mut project = Project::new();
        project
            .add_execution(exec(
                "a",
                &format!("touch {}/taskforge-test-a", std::env::temp_dir().display()),
                &[],
            ))
            .unwrap();
        project
            .add_execution(exec(
                "b",
                &format!(
                    "test -f {}/taskforge-test-a",
                    std::env::temp_dir().display()
                ),
                &["a"],
            ))
            .unwrap();

        let summary = execute(&project, &["b".to_string()], &SchedulerConfig { num_workers: 2 })
            .unwrap();

        assert_eq!(summary.overall, TaskStatus::Success);
        let _ = std::fs::remove_file(format!("{}/taskforge-test-a", std::env::temp_dir().display()));
    }

    #[test]
    fn failing_task_fails_the_run_and_blocks_unplanned_dependents() {
        let mut project = Project::new();
        project.add_execution(exec("a", "exit 1", &[])).unwrap();
        project.add_execution(exec("b", "true", &["a"])).unwrap();

        let summary = execute(&project, &["b".to_string()], &SchedulerConfig { num_workers: 2 })
            .unwrap();

        assert_eq!(summary.overall, TaskStatus::Failed);
        let b_status = summary
            .statuses
            .iter()
            .find(|(_, name, _)| name == "b")
            .unwrap()
            .2;
        assert_eq!(b_status, TaskStatus::NotPlan);
    }

    #[test]
    fn empty_root_set_resolves_to_success_with_no_tasks() {
        let project = Project::new();
        let summary = execute(&project, &[], &SchedulerConfig::default()).unwrap();
        assert_eq!(summary.overall, TaskStatus::Success);
        assert!(summary.statuses.is_empty());
    }

    #[test]
    fn stdout_is_streamed_into_the_log_channel() {
        let mut project = Project::new();
        project
            .add_execution(exec("greet", "echo 'Hello world'", &[]))
            .unwrap();

        let summary =
            execute(&project, &["greet".to_string()], &SchedulerConfig { num_workers: 1 })
                .unwrap();
        assert_eq!(summary.overall, TaskStatus::Success);

        let records: Vec<_> = summary.log_rx.try_iter().collect();
        assert!(records.iter().any(|r| r.message == "Hello world"));
    }

    #[test]
    fn pipeline_target_runs_every_execution_across_all_steps() {
        use crate::model::pipeline::{PipelineBuilder, PipelineStep};

        let mut project = Project::new();
        project.add_execution(exec("a", "true", &[])).unwrap();
        project.add_execution(exec("b", "true", &["a"])).unwrap();
        let pipeline = PipelineBuilder::new()
            .name("ci")
            .step(PipelineStep::new("only", ["a", "b"]))
            .build()
            .unwrap();
        project.add_pipeline(pipeline).unwrap();

        let summary =
            execute(&project, &["ci".to_string()], &SchedulerConfig { num_workers: 2 }).unwrap();

        assert_eq!(summary.overall, TaskStatus::Success);
        assert_eq!(summary.statuses.len(), 2);
    }

    #[test]
    fn fail_fast_signals_a_sibling_still_running() {
        let mut project = Project::new();
        project.add_execution(exec("fails-fast", "exit 1", &[])).unwrap();
        project
            .add_execution(exec("long-runner", "sleep 5; echo done", &[]))
            .unwrap();

        let start = std::time::Instant::now();
        let summary = execute(
            &project,
            &["fails-fast".to_string(), "long-runner".to_string()],
            &SchedulerConfig { num_workers: 2 },
        )
        .unwrap();

        assert_eq!(summary.overall, TaskStatus::Failed);
        // The long runner should have been signalled well before its 5s
        // sleep would otherwise have elapsed.
        assert!(start.elapsed() < std::time::Duration::from_secs(4));
    }
}
