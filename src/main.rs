//! Thin entry point: enough to drive the engine manually for smoke-testing.
//! Building a real `Project` is a parser adapter's job, not this binary's —
//! this wires up a tiny demo project so `cli`/`conf`/`logging`/`scheduler`
//! can all be exercised together end-to-end.

use anyhow::Result;
use clap::Parser;
use taskforge::cli::Cli;
use taskforge::conf::{Configuration, EngineConfig};
use taskforge::model::execution::ExecutionBuilder;
use taskforge::model::project::Project;
use taskforge::model::reference::ReferenceExecution;
use taskforge::model::status::TaskStatus;
use taskforge::scheduler::{self, SchedulerConfig};
use tracing::{error, info};

fn demo_project() -> Result<Project> {
    let mut project = Project::new();

    project.add_execution(
        ExecutionBuilder::new()
            .name("hello")
            .language("sh")
            .script("echo 'Hello world'")
            .working_dir(".")
            .build()?,
    )?;

    project.add_execution(
        ExecutionBuilder::new()
            .name("build")
            .language("sh")
            .script("echo 'building...'")
            .working_dir(".")
            .prev(ReferenceExecution::new("hello"))
            .build()?,
    )?;

    Ok(project)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config: EngineConfig = Configuration::load(cli.config.clone())?;
    taskforge::logging::init_logger(&config.engine.log_level, cli.pretty || config.engine.pretty_logging)?;

    let project = demo_project()?;
    let scheduler_config = SchedulerConfig {
        num_workers: config.resolved_num_workers(),
    };

    info!(targets = ?cli.targets, "starting run");
    let summary = scheduler::execute(&project, &cli.targets, &scheduler_config)?;

    while let Ok(record) = summary.log_rx.try_recv() {
        info!(
            span_id = %record.span_id(),
            source = %record.source,
            "{}",
            record.message
        );
    }

    for (id, name, status) in &summary.statuses {
        info!(%id, %name, %status, "task finished");
    }

    match summary.overall {
        TaskStatus::Success => {
            info!("run succeeded");
            Ok(())
        }
        other => {
            error!(overall = %other, "run did not succeed");
            std::process::exit(1);
        }
    }
}
