//! The domain model: executions, pipelines, the project registry they live
//! in, and the status each execution moves through over a run.

pub mod execution;
pub mod ids;
pub mod pipeline;
pub mod project;
pub mod reference;
pub mod status;

pub use execution::{Execution, ExecutionBuilder, Language};
pub use ids::{ExecutionId, PipelineId};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineStep};
pub use project::Project;
pub use reference::ReferenceExecution;
pub use status::TaskStatus;
